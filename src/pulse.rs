//! Pulse data consumed by the encoder and produced by `SuperDst::unpack`.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Identifier of an optical sensor: string number, OM number along the string, and PMT number.
///
/// The PMT number is not part of the encoded form; decoded keys always carry PMT 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OmKey {
    pub string: i32,
    pub om: u32,
    pub pmt: u8,
}

impl OmKey {
    pub const fn new(string: i32, om: u32) -> Self {
        Self { string, om, pmt: 0 }
    }

    /// Surface (IceTop) tanks occupy OM numbers above 60.
    #[inline]
    pub const fn is_icetop(&self) -> bool {
        self.om > 60
    }
}

impl fmt::Display for OmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OMKey({},{},{})", self.string, self.om, self.pmt)
    }
}

/// Digitizer and coincidence flags attached to a pulse.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PulseFlags(u8);

impl PulseFlags {
    /// Pulse was part of a hard local coincidence launch.
    pub const LC: Self = Self(1);
    pub const ATWD: Self = Self(2);
    pub const FADC: Self = Self(4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PulseFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PulseFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PulseFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// A reconstructed photon detection: time in ns, charge in pC, width in ns.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RecoPulse {
    pub time: f64,
    pub charge: f32,
    pub width: f32,
    pub flags: PulseFlags,
}

impl RecoPulse {
    pub const fn new(time: f64, charge: f32, width: f32, flags: PulseFlags) -> Self {
        Self {
            time,
            charge,
            width,
            flags,
        }
    }

    #[inline]
    pub const fn is_hlc(&self) -> bool {
        self.flags.contains(PulseFlags::LC)
    }
}

/// Pulses per sensor, each list ordered by time.
pub type PulseMap = BTreeMap<OmKey, Vec<RecoPulse>>;
