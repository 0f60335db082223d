//! Quantized (time, charge, width) samples.

use crate::pulse::RecoPulse;
use crate::quantize::{self, ChargeFormat, Version};
use crate::{EncodeError, TMIN};

/// Local-coincidence class of a launch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LcKind {
    /// Hard local coincidence: full waveform readout.
    Hlc,
    /// Soft local coincidence: charge stamp only.
    Slc,
}

impl LcKind {
    #[inline]
    pub const fn from_hlc(hlc: bool) -> Self {
        if hlc {
            LcKind::Hlc
        } else {
            LcKind::Slc
        }
    }

    #[inline]
    pub const fn is_hlc(self) -> bool {
        matches!(self, LcKind::Hlc)
    }
}

/// Width code assumed for every stamp of a version 0 stream, which carries no widths.
pub(crate) fn v0_widthcode() -> u32 {
    // One v0 time step is 4 ns, exactly 1 << 2.
    quantize::encode_width(quantize::decode_time(1, Version::V0), 4).unwrap_or(2)
}

/// One quantized sample within a readout.
///
/// `timecode` is absolute (relative to [`TMIN`]) when the stamp is built and becomes a delta
/// once its readout is relativized: against the previous stamp, or for the leading stamp
/// against the previous readout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChargeStamp {
    timecode: u32,
    widthcode: u32,
    chargecode: u32,
    version: Version,
    kind: LcKind,
    charge_format: ChargeFormat,
}

/// Field width used for stamp-level charge codes; the wire layer narrows them.
pub(crate) const STAMP_CODE_BITS: u32 = 31;
/// Width codes are run-length coded as nibbles.
pub(crate) const WIDTH_CODE_BITS: u32 = 4;

impl ChargeStamp {
    /// Quantize `pulse`. Charge is clamped at zero and width at 1 ns before quantization.
    pub(crate) fn from_pulse(
        pulse: &RecoPulse,
        version: Version,
        charge_format: ChargeFormat,
    ) -> Result<Self, EncodeError> {
        let time = pulse.time - TMIN;
        if time < 0.0 {
            return Err(EncodeError::TimeBeforeEpoch {
                time: pulse.time,
                tmin: TMIN,
            });
        }
        let charge = f64::from(pulse.charge).max(0.0);
        let width = f64::from(pulse.width)
            .max(1.0)
            .min(f64::from(u32::MAX >> 1));
        let widthcode = match version {
            Version::V0 => v0_widthcode(),
            Version::V1 => quantize::encode_width(width, WIDTH_CODE_BITS)?,
        };
        Ok(Self {
            timecode: quantize::encode_bounded_time(time, version)
                .map_err(|_| EncodeError::TimeNotRepresentable(pulse.time))?,
            widthcode,
            chargecode: quantize::encode_charge(charge, STAMP_CODE_BITS, version, charge_format)?,
            version,
            kind: LcKind::from_hlc(pulse.is_hlc()),
            charge_format,
        })
    }

    pub(crate) fn from_codes(
        timecode: u32,
        chargecode: u32,
        widthcode: u32,
        version: Version,
        kind: LcKind,
        charge_format: ChargeFormat,
    ) -> Self {
        Self {
            timecode,
            widthcode,
            chargecode,
            version,
            kind,
            charge_format,
        }
    }

    pub fn timecode(&self) -> u32 {
        self.timecode
    }

    pub(crate) fn set_timecode(&mut self, timecode: u32) {
        self.timecode = timecode;
    }

    pub fn chargecode(&self) -> u32 {
        self.chargecode
    }

    pub fn widthcode(&self) -> u32 {
        self.widthcode
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn kind(&self) -> LcKind {
        self.kind
    }

    pub fn charge_format(&self) -> ChargeFormat {
        self.charge_format
    }

    /// Time delta carried by this stamp, in ns.
    pub fn time_delta(&self) -> f64 {
        quantize::decode_time(u64::from(self.timecode), self.version)
    }

    /// Decoded charge in pC.
    pub fn charge(&self) -> f64 {
        quantize::decode_charge(self.chargecode, self.version, self.charge_format)
    }

    /// Decoded width in ns.
    pub fn width(&self) -> f64 {
        quantize::decode_width(self.widthcode)
    }
}
