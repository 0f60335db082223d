//! Readouts: unbroken runs of same-kind pulses on one sensor.

use crate::pulse::{OmKey, RecoPulse};
use crate::quantize::{self, ChargeFormat, Version};
use crate::stamp::{v0_widthcode, ChargeStamp, LcKind};
use crate::wire::{
    push_overflow_chain, width_class, DomHeader, StampReader, StampWord, Streams, WireStamp,
    CHARGE_BITS, MAX_CHARGECODE, MAX_HEADER_TIMECODE, MAX_STAMP_TIMECODE, REL_TIME_BITS,
};
use crate::{DecodeError, EncodeError};

/// Largest gap between consecutive pulses that stays within one readout, in ns.
pub const MAX_READOUT_GAP: f64 = 6450.0;

/// Split time-sorted `pulses` from one sensor into readout-sized runs.
///
/// A new run starts when the local-coincidence bit differs from the run's first pulse, when the
/// gap to the previous pulse exceeds [`MAX_READOUT_GAP`], and on every pulse of a surface tank.
pub(crate) fn split_pulses(om: OmKey, pulses: &[RecoPulse]) -> Vec<&[RecoPulse]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..pulses.len() {
        let split = om.is_icetop()
            || pulses[i].is_hlc() != pulses[start].is_hlc()
            || pulses[i].time - pulses[i - 1].time > MAX_READOUT_GAP;
        if split {
            runs.push(&pulses[start..i]);
            start = i;
        }
    }
    if start < pulses.len() {
        runs.push(&pulses[start..]);
    }
    runs
}

/// Charge discretization used for a sensor in a given stream version.
#[inline]
pub(crate) fn charge_format(om: OmKey, version: Version) -> ChargeFormat {
    if version >= Version::V1 && om.is_icetop() {
        ChargeFormat::Log
    } else {
        ChargeFormat::Linear
    }
}

/// One sensor launch window: a non-empty sequence of stamps sharing a local-coincidence kind.
#[derive(Clone, Debug)]
pub struct Readout {
    om: OmKey,
    dom_id: u16,
    start_time: f64,
    kind: LcKind,
    stamps: Vec<ChargeStamp>,
}

impl Readout {
    /// Build a readout from a non-empty, time-sorted run of pulses.
    pub(crate) fn from_pulses(
        om: OmKey,
        pulses: &[RecoPulse],
        version: Version,
    ) -> Result<Self, EncodeError> {
        let dom_id = quantize::encode_omkey(om)?;
        let format = charge_format(om, version);
        let stamps = pulses
            .iter()
            .map(|p| ChargeStamp::from_pulse(p, version, format))
            .collect::<Result<Vec<_>, _>>()?;
        let first = pulses.first().copied().unwrap_or_default();
        Ok(Self {
            om,
            dom_id,
            start_time: first.time,
            kind: LcKind::from_hlc(first.is_hlc()),
            stamps,
        })
    }

    pub fn om(&self) -> OmKey {
        self.om
    }

    /// Absolute time of the first stamp in ns. Informational only; the stamp chain is
    /// authoritative.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn kind(&self) -> LcKind {
        self.kind
    }

    pub fn stamps(&self) -> &[ChargeStamp] {
        &self.stamps
    }

    pub(crate) fn set_start_time(&mut self, start_time: f64) {
        self.start_time = start_time;
    }

    /// Time code of the leading stamp.
    pub(crate) fn reference_code(&self) -> u32 {
        self.stamps.first().map_or(0, |s| s.timecode())
    }

    /// Replace each stamp's absolute time code with the delta to its predecessor.
    pub(crate) fn relativize(&mut self) -> Result<(), EncodeError> {
        for i in (1..self.stamps.len()).rev() {
            let delta = self.stamps[i]
                .timecode()
                .checked_sub(self.stamps[i - 1].timecode())
                .ok_or(EncodeError::NonMonotonicTime { om: self.om })?;
            self.stamps[i].set_timecode(delta);
        }
        Ok(())
    }

    /// Relativize this readout and express its leading stamp against `reference`, whose
    /// leading stamp must still be absolute.
    pub(crate) fn set_time_reference(&mut self, reference: &Readout) -> Result<(), EncodeError> {
        self.relativize()?;
        let delta = self
            .reference_code()
            .checked_sub(reference.reference_code())
            .ok_or(EncodeError::NonMonotonicTime { om: self.om })?;
        if let Some(first) = self.stamps.first_mut() {
            first.set_timecode(delta);
        }
        Ok(())
    }

    /// Append this readout to `streams` and return the bytes attributable to it.
    pub(crate) fn write_streams(&self, streams: &mut Streams, version: Version) -> usize {
        let icetop = self.om.is_icetop();
        let mut header = DomHeader {
            dom_id: self.dom_id,
            slop: 0,
        };
        let words_before = streams.stamps.len();
        let extra_before = streams.extra.len();
        let last = self.stamps.len().saturating_sub(1);

        for (i, stamp) in self.stamps.iter().enumerate() {
            let max_time = if i == 0 {
                MAX_HEADER_TIMECODE
            } else {
                MAX_STAMP_TIMECODE
            };
            let time = stamp.timecode().min(max_time);
            if i == 0 {
                header.slop = (time >> REL_TIME_BITS) as u8;
            }

            let (charge, charge_overflow) = match stamp.charge_format() {
                ChargeFormat::Linear => {
                    let charge = stamp.chargecode().min(MAX_CHARGECODE);
                    let overflow =
                        (charge == MAX_CHARGECODE).then(|| stamp.chargecode() - MAX_CHARGECODE);
                    (charge, overflow)
                }
                ChargeFormat::Log => {
                    streams.extra.push((stamp.chargecode() >> CHARGE_BITS) as u8);
                    (stamp.chargecode() & MAX_CHARGECODE, None)
                }
            };

            let word = StampWord {
                rel_time: time as u8,
                charge: charge as u8,
                hlc: stamp.kind().is_hlc(),
                stop: i == last,
            };
            streams.stamps.push(WireStamp::Stamp(word).pack());
            if time == max_time {
                push_overflow_chain(&mut streams.stamps, stamp.timecode() - max_time);
            }
            if let Some(remainder) = charge_overflow {
                push_overflow_chain(&mut streams.stamps, remainder);
            }
            if version == Version::V1 {
                let class = width_class(icetop, stamp.kind().is_hlc());
                streams.widths[class].push(stamp.widthcode() as u8);
            }
        }
        streams.headers.push(header.pack());

        2 + 2 * (streams.stamps.len() - words_before) + (streams.extra.len() - extra_before)
    }

    /// Read one readout described by `header_word` from the decoded streams.
    ///
    /// Stamps keep their relative time codes; the caller sets the absolute start time.
    pub(crate) fn read_streams<'a>(
        header_word: u16,
        reader: &mut StampReader<'_>,
        widths: &mut WidthReader,
        extra: &mut impl Iterator<Item = &'a u8>,
        version: Version,
    ) -> Result<Self, DecodeError> {
        let header = DomHeader::unpack(header_word);
        let om = quantize::decode_omkey(header.dom_id);
        let icetop = om.is_icetop();
        let format = charge_format(om, version);

        let mut stamps: Vec<ChargeStamp> = Vec::new();
        loop {
            let slop = stamps.is_empty().then_some(header.slop);
            let raw = reader.read_stamp(slop, format == ChargeFormat::Linear)?;
            let chargecode = match format {
                ChargeFormat::Linear => raw.charge,
                ChargeFormat::Log => {
                    let upper = extra
                        .next()
                        .ok_or(DecodeError::MalformedData("extra byte stream too short"))?;
                    raw.charge | (u32::from(*upper) << CHARGE_BITS)
                }
            };
            let widthcode = match version {
                Version::V0 => v0_widthcode(),
                Version::V1 => widths.next(width_class(icetop, raw.hlc))?,
            };
            stamps.push(ChargeStamp::from_codes(
                raw.timecode,
                chargecode,
                widthcode,
                version,
                LcKind::from_hlc(raw.hlc),
                format,
            ));
            if raw.stop {
                break;
            }
        }

        Ok(Self {
            om,
            dom_id: header.dom_id,
            start_time: 0.0,
            kind: stamps[0].kind(),
            stamps,
        })
    }
}

// start_time is derived, not encoded.
impl PartialEq for Readout {
    fn eq(&self, other: &Self) -> bool {
        self.om == other.om && self.kind == other.kind && self.stamps == other.stamps
    }
}

/// Cursors over the four expanded width streams.
pub(crate) struct WidthReader {
    values: [Vec<u8>; 4],
    pos: [usize; 4],
}

impl WidthReader {
    pub fn new(values: [Vec<u8>; 4]) -> Self {
        Self {
            values,
            pos: [0; 4],
        }
    }

    fn next(&mut self, class: usize) -> Result<u32, DecodeError> {
        let v = *self.values[class]
            .get(self.pos[class])
            .ok_or(DecodeError::MalformedData("width stream too short"))?;
        self.pos[class] += 1;
        Ok(u32::from(v))
    }

    /// True once every width has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.values
            .iter()
            .zip(self.pos.iter())
            .all(|(v, &p)| v.len() == p)
    }
}
