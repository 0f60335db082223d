//! Scalar quantizers mapping physical quantities onto fixed-width integer codes.
//!
//! Time and linear charge codes saturate at `2^maxbits - 1` instead of wrapping; the wire layer
//! signals saturation with overflow chains. All quantizers are versioned: version 0 streams
//! use coarser time and charge steps than version 1.

use std::fmt;

use crate::pulse::OmKey;
use crate::{DecodeError, EncodeError};

/// Encoding revision of a SuperDST stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Version {
    /// 4 ns time steps, 0.15 pC linear charge steps, no width or extra-byte streams.
    V0 = 0,
    /// 1 ns time steps, 0.05 pC linear charge steps, run-length coded widths, log charge for
    /// surface tanks.
    #[default]
    V1 = 1,
}

impl Version {
    pub const LATEST: Version = Version::V1;

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    const fn time_step(self) -> f64 {
        match self {
            Version::V0 => 4.0,
            Version::V1 => 1.0,
        }
    }

    const fn charge_step(self) -> f64 {
        match self {
            Version::V0 => 0.15,
            Version::V1 => 0.05,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Version::V0),
            1 => Ok(Version::V1),
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

/// How a stamp's charge code is discretized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChargeFormat {
    /// Fixed-point charge, overflow chained.
    Linear,
    /// Pseudo-logarithmic charge spanning nine decades in [`LOG_CHARGE_BITS`] bits.
    Log,
}

/// Width of a log charge code.
pub const LOG_CHARGE_BITS: u32 = 14;
const LOG_CHARGE_DECADES: f64 = 9.0;
const LOG_CHARGE_OFFSET: f64 = 2.0;

/// Width of a DOM id: 7 bits of string, 6 bits of OM.
pub const DOM_ID_BITS: u32 = 13;
const OM_BITS: u32 = 6;
const MAX_STRING: i32 = (1 << (DOM_ID_BITS - OM_BITS)) - 1;
const MAX_OM: u32 = 1 << OM_BITS;

#[inline]
const fn max_code(maxbits: u32) -> u32 {
    ((1u64 << maxbits) - 1) as u32
}

fn check_bits(field: &'static str, maxbits: u32, min: u32) -> Result<(), EncodeError> {
    if maxbits > 31 || maxbits < min {
        Err(EncodeError::InvalidBitWidth {
            field,
            bits: maxbits,
        })
    } else {
        Ok(())
    }
}

/// Round to the nearest integer, saturating at `2^maxbits - 1`.
#[inline]
fn truncate(value: f64, maxbits: u32) -> u32 {
    let max = max_code(maxbits);
    let rounded = value.round();
    if rounded >= f64::from(max) {
        max
    } else {
        rounded as u32
    }
}

/// Quantize a non-negative time offset.
pub fn encode_time(time: f64, maxbits: u32, version: Version) -> Result<u32, EncodeError> {
    check_bits("time", maxbits, 1)?;
    if !(time >= 0.0) {
        return Err(EncodeError::NegativeTime(time));
    }
    Ok(truncate(time / version.time_step(), maxbits))
}

/// Width of absolute time codes and trigger lengths.
pub(crate) const TIME_CODE_BITS: u32 = 31;

/// Quantize a time offset into [`TIME_CODE_BITS`] bits, failing instead of saturating.
pub(crate) fn encode_bounded_time(time: f64, version: Version) -> Result<u32, EncodeError> {
    let code = encode_time(time, TIME_CODE_BITS, version)?;
    if code == max_code(TIME_CODE_BITS) {
        return Err(EncodeError::TimeNotRepresentable(time));
    }
    Ok(code)
}

/// Inverse of [`encode_time`].
#[inline]
pub fn decode_time(code: u64, version: Version) -> f64 {
    code as f64 * version.time_step()
}

/// Quantize a width to the exponent of the smallest power of two nanoseconds that covers it.
pub fn encode_width(width: f64, maxbits: u32) -> Result<u32, EncodeError> {
    check_bits("width", maxbits, 1)?;
    if !(width > 0.0 && width < f64::from(u32::MAX)) {
        return Err(EncodeError::InvalidWidth(width));
    }
    let ns = width.ceil() as u32;
    let code = if ns > 1 << 31 {
        32
    } else {
        ns.next_power_of_two().trailing_zeros()
    };
    Ok(code.min(max_code(maxbits)))
}

/// Inverse of [`encode_width`].
#[inline]
pub fn decode_width(code: u32) -> f64 {
    f64::from(1u32 << code.min(31))
}

/// Quantize a non-negative charge.
///
/// Linear version 0 rounds to the nearest 0.15 pC step; linear version 1 floors to 0.05 pC
/// steps. Log charges map `log10(q) + 2` (clamped at zero) onto [`LOG_CHARGE_BITS`] bits and
/// never saturate into an overflow chain.
pub fn encode_charge(
    charge: f64,
    maxbits: u32,
    version: Version,
    format: ChargeFormat,
) -> Result<u32, EncodeError> {
    let charge = charge.max(0.0);
    match format {
        ChargeFormat::Linear => {
            check_bits("charge", maxbits, 1)?;
            let scaled = charge / version.charge_step();
            Ok(match version {
                Version::V0 => truncate(scaled, maxbits),
                Version::V1 => truncate(scaled.floor(), maxbits),
            })
        }
        ChargeFormat::Log => {
            check_bits("log charge", maxbits, LOG_CHARGE_BITS)?;
            let decades = (charge.log10() + LOG_CHARGE_OFFSET).max(0.0);
            let scale = f64::from(max_code(LOG_CHARGE_BITS)) / LOG_CHARGE_DECADES;
            Ok(truncate(decades * scale, LOG_CHARGE_BITS))
        }
    }
}

/// Inverse of [`encode_charge`].
pub fn decode_charge(code: u32, version: Version, format: ChargeFormat) -> f64 {
    match format {
        ChargeFormat::Linear => match version {
            Version::V0 => f64::from(code) * version.charge_step(),
            Version::V1 => (f64::from(code) + 0.5) * version.charge_step(),
        },
        ChargeFormat::Log => {
            let scale = LOG_CHARGE_DECADES / f64::from(max_code(LOG_CHARGE_BITS));
            10f64.powf(f64::from(code) * scale - LOG_CHARGE_OFFSET)
        }
    }
}

/// Pack a sensor key into a 13-bit DOM id. The PMT number is dropped.
pub fn encode_omkey(key: OmKey) -> Result<u16, EncodeError> {
    if !(0..=MAX_STRING).contains(&key.string) {
        return Err(EncodeError::InvalidString(key.string));
    }
    if !(1..=MAX_OM).contains(&key.om) {
        return Err(EncodeError::InvalidOm(key.om));
    }
    Ok(((key.string as u16) << OM_BITS) | (key.om - 1) as u16)
}

/// Inverse of [`encode_omkey`]. Bits above [`DOM_ID_BITS`] are ignored.
pub fn decode_omkey(dom_id: u16) -> OmKey {
    let dom_id = dom_id & ((1 << DOM_ID_BITS) - 1);
    OmKey::new(i32::from(dom_id >> OM_BITS), u32::from(dom_id & ((1 << OM_BITS) - 1)) + 1)
}
