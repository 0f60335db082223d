//! Bit layout of the 16-bit words making up the header and stamp streams.
//!
//! Layouts are defined once, least significant bit first, and always go through explicit
//! pack/unpack functions; words are stored little-endian by the compact vector layer.
//!
//! ```text
//! DomHeader:  | slop:3 | dom_id:13 |
//! Stamp:      | stop:1 | hlc:1 | charge:6 | rel_time:8 |
//! Overflow:   |            code:16                     |
//! ```
//!
//! A stamp whose time (or linear charge) field holds its maximum value is followed by an
//! overflow chain: words added to the field until a word below `u16::MAX` ends the chain. Time
//! chains come before charge chains. Overflow words carry no tag; only their position after a
//! saturated stamp marks them as overflow.

use crate::quantize::DOM_ID_BITS;
use crate::DecodeError;

pub(crate) const REL_TIME_BITS: u32 = 8;
pub(crate) const SLOP_BITS: u32 = 3;
pub(crate) const CHARGE_BITS: u32 = 6;

/// Largest time code a non-leading stamp can hold without overflow.
pub const MAX_STAMP_TIMECODE: u32 = (1 << REL_TIME_BITS) - 1;
/// Largest time code the leading stamp of a readout can hold, using the header slop bits.
pub const MAX_HEADER_TIMECODE: u32 = (1 << (REL_TIME_BITS + SLOP_BITS)) - 1;
/// Largest linear charge code a stamp can hold without overflow.
pub const MAX_CHARGECODE: u32 = (1 << CHARGE_BITS) - 1;
/// Largest magnitude carried by one overflow word.
pub const MAX_OVERFLOW: u32 = u16::MAX as u32;

const DOM_ID_MASK: u16 = (1 << DOM_ID_BITS) - 1;

/// Per-readout header word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct DomHeader {
    pub dom_id: u16,
    /// Upper bits of the leading stamp's time code.
    pub slop: u8,
}

impl DomHeader {
    #[inline]
    pub fn pack(self) -> u16 {
        (self.dom_id & DOM_ID_MASK) | (u16::from(self.slop) << DOM_ID_BITS)
    }

    #[inline]
    pub fn unpack(word: u16) -> Self {
        Self {
            dom_id: word & DOM_ID_MASK,
            slop: (word >> DOM_ID_BITS) as u8,
        }
    }
}

/// A regular stamp word.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StampWord {
    pub rel_time: u8,
    pub charge: u8,
    pub hlc: bool,
    /// Last stamp of its readout.
    pub stop: bool,
}

impl StampWord {
    #[inline]
    pub fn pack(self) -> u16 {
        u16::from(self.rel_time)
            | (u16::from(self.charge & MAX_CHARGECODE as u8) << REL_TIME_BITS)
            | (u16::from(self.hlc) << 14)
            | (u16::from(self.stop) << 15)
    }

    #[inline]
    pub fn unpack(word: u16) -> Self {
        Self {
            rel_time: word as u8,
            charge: ((word >> REL_TIME_BITS) as u8) & MAX_CHARGECODE as u8,
            hlc: word & (1 << 14) != 0,
            stop: word & (1 << 15) != 0,
        }
    }
}

/// One word of the stamp stream, tagged by how the decoder interprets it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum WireStamp {
    Stamp(StampWord),
    Overflow(u16),
}

impl WireStamp {
    #[inline]
    pub fn pack(self) -> u16 {
        match self {
            WireStamp::Stamp(s) => s.pack(),
            WireStamp::Overflow(code) => code,
        }
    }
}

/// Append the overflow chain for `remainder`.
///
/// Full words are written while the remainder allows; a chain whose last word is exactly
/// `MAX_OVERFLOW` is closed with an extra zero word.
pub(crate) fn push_overflow_chain(words: &mut Vec<u16>, mut remainder: u32) -> usize {
    let start = words.len();
    loop {
        let chunk = remainder.min(MAX_OVERFLOW);
        words.push(WireStamp::Overflow(chunk as u16).pack());
        remainder -= chunk;
        if chunk < MAX_OVERFLOW {
            break;
        }
    }
    tracing::trace!(words = words.len() - start, "wrote overflow chain");
    words.len() - start
}

/// Index of the width stream for a stamp class, in wire order
/// {in-ice SLC, in-ice HLC, surface SLC, surface HLC}.
#[inline]
pub(crate) const fn width_class(icetop: bool, hlc: bool) -> usize {
    ((icetop as usize) << 1) | hlc as usize
}

/// Every stream a readout collection is written to, before framing.
#[derive(Clone, Debug, Default)]
pub(crate) struct Streams {
    pub stamps: Vec<u16>,
    pub headers: Vec<u16>,
    pub widths: [Vec<u8>; 4],
    pub extra: Vec<u8>,
}

/// Stamp fields recovered from the stamp stream, overflow chains applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DecodedStamp {
    pub timecode: u32,
    /// Full linear charge code, or the low bits of a log charge code.
    pub charge: u32,
    pub hlc: bool,
    pub stop: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ReadState {
    AwaitingStamp,
    AwaitingOverflowTime,
    AwaitingOverflowCharge,
}

/// Walks the stamp stream word by word.
pub(crate) struct StampReader<'a> {
    words: &'a [u16],
    pos: usize,
}

impl<'a> StampReader<'a> {
    pub fn new(words: &'a [u16]) -> Self {
        Self { words, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.pos
    }

    fn next_word(&mut self) -> Result<u16, DecodeError> {
        let word = *self
            .words
            .get(self.pos)
            .ok_or(DecodeError::MalformedData("stamp stream ends inside a readout"))?;
        self.pos += 1;
        Ok(word)
    }

    /// Read one logical stamp and any overflow words that belong to it.
    ///
    /// `slop` is the header slop for the leading stamp of a readout and `None` otherwise.
    /// Charge chains are only followed for linear charges.
    pub fn read_stamp(
        &mut self,
        slop: Option<u8>,
        linear_charge: bool,
    ) -> Result<DecodedStamp, DecodeError> {
        let mut stamp = DecodedStamp::default();
        let mut charge_saturated = false;
        let mut state = ReadState::AwaitingStamp;
        loop {
            let word = self.next_word()?;
            state = match state {
                ReadState::AwaitingStamp => {
                    let s = StampWord::unpack(word);
                    let (timecode, max_time) = match slop {
                        Some(slop) => (
                            u32::from(s.rel_time) | (u32::from(slop) << REL_TIME_BITS),
                            MAX_HEADER_TIMECODE,
                        ),
                        None => (u32::from(s.rel_time), MAX_STAMP_TIMECODE),
                    };
                    stamp = DecodedStamp {
                        timecode,
                        charge: u32::from(s.charge),
                        hlc: s.hlc,
                        stop: s.stop,
                    };
                    charge_saturated = linear_charge && stamp.charge == MAX_CHARGECODE;
                    if timecode == max_time {
                        ReadState::AwaitingOverflowTime
                    } else if charge_saturated {
                        ReadState::AwaitingOverflowCharge
                    } else {
                        return Ok(stamp);
                    }
                }
                ReadState::AwaitingOverflowTime => {
                    stamp.timecode = stamp
                        .timecode
                        .checked_add(u32::from(word))
                        .ok_or(DecodeError::MalformedData("time overflow chain too long"))?;
                    if u32::from(word) == MAX_OVERFLOW {
                        ReadState::AwaitingOverflowTime
                    } else if charge_saturated {
                        ReadState::AwaitingOverflowCharge
                    } else {
                        return Ok(stamp);
                    }
                }
                ReadState::AwaitingOverflowCharge => {
                    stamp.charge = stamp
                        .charge
                        .checked_add(u32::from(word))
                        .ok_or(DecodeError::MalformedData("charge overflow chain too long"))?;
                    if u32::from(word) == MAX_OVERFLOW {
                        ReadState::AwaitingOverflowCharge
                    } else {
                        return Ok(stamp);
                    }
                }
            };
        }
    }
}
