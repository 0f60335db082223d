//! The top-level SuperDST codec: readout construction, stream framing and unpacking.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::compact::{compact_vec_len, get_compact_vec, put_compact_vec};
use crate::pulse::{OmKey, PulseFlags, PulseMap, RecoPulse};
use crate::quantize::{self, Version};
use crate::readout::{self, Readout, WidthReader};
use crate::run::{decode_runs, encode_runs};
use crate::wire::{StampReader, Streams};
use crate::{DecodeError, EncodeError, TMIN};

/// Encoder settings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Stream version to quantize for and emit.
    pub version: Version,
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// A compressed pulse series.
///
/// Readouts are held in ascending start-time order with their time codes relativized: each
/// stamp against its predecessor and each readout's leading stamp against the previous
/// readout's, the first readout anchored at [`TMIN`].
///
/// The unpacked pulse map is computed on first use and cached. The cache is not `Sync`.
#[derive(Clone, Debug)]
pub struct SuperDst {
    readouts: Vec<Readout>,
    version: Version,
    unpacked: OnceCell<PulseMap>,
}

impl SuperDst {
    /// Compress `pulses` with the default configuration.
    pub fn new(pulses: &PulseMap) -> Result<Self, EncodeError> {
        Self::with_config(pulses, EncoderConfig::default())
    }

    pub fn with_config(pulses: &PulseMap, config: EncoderConfig) -> Result<Self, EncodeError> {
        let mut dst = Self {
            readouts: Vec::new(),
            version: config.version,
            unpacked: OnceCell::new(),
        };
        dst.add_pulse_map(pulses)?;
        Ok(dst)
    }

    /// Replace the contents with a freshly compressed `pulses`, dropping any cached unpacking.
    pub fn set_pulse_map(&mut self, pulses: &PulseMap) -> Result<(), EncodeError> {
        self.readouts.clear();
        self.unpacked.take();
        self.add_pulse_map(pulses)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn readouts(&self) -> &[Readout] {
        &self.readouts
    }

    fn add_pulse_map(&mut self, pulses: &PulseMap) -> Result<(), EncodeError> {
        let mut readouts = Vec::new();
        let mut dropped = 0;
        for (&om, list) in pulses {
            let mut sorted: Vec<RecoPulse> = list
                .iter()
                .filter(|p| p.time.is_finite() && p.charge.is_finite())
                .copied()
                .collect();
            dropped += list.len() - sorted.len();
            // Stable: equal times keep their input order.
            sorted.sort_by(|a, b| a.time.total_cmp(&b.time));
            match sorted.first() {
                None => continue,
                Some(first) if first.time < TMIN => {
                    return Err(EncodeError::TimeBeforeEpoch {
                        time: first.time,
                        tmin: TMIN,
                    })
                }
                Some(_) => {}
            }
            for run in readout::split_pulses(om, &sorted) {
                readouts.push(Readout::from_pulses(om, run, self.version)?);
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "dropped pulses with non-finite time or charge");
        }

        readouts.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));
        for i in (1..readouts.len()).rev() {
            let (head, tail) = readouts.split_at_mut(i);
            tail[0].set_time_reference(&head[i - 1])?;
        }
        if let Some(first) = readouts.first_mut() {
            first.relativize()?;
        }

        tracing::debug!(
            sensors = pulses.len(),
            readouts = readouts.len(),
            stamps = readouts.iter().map(|r| r.stamps().len()).sum::<usize>(),
            version = %self.version,
            "built SuperDST readouts"
        );
        self.readouts = readouts;
        Ok(())
    }

    fn streams(&self) -> Streams {
        let mut streams = Streams::default();
        for r in &self.readouts {
            r.write_streams(&mut streams, self.version);
        }
        streams
    }

    /// Serialize the readouts in this object's version, without a version tag.
    ///
    /// Version 1 layout: stamps, headers, four run-length coded width streams, extra bytes.
    /// Version 0 layout: stamps, headers.
    pub fn save<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        let streams = self.streams();
        let widths = match self.version {
            Version::V0 => Vec::new(),
            Version::V1 => streams
                .widths
                .iter()
                .map(|w| {
                    let mut codes = Vec::new();
                    encode_runs(w, &mut codes).map(|_| codes)
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        put_compact_vec(buf, &streams.stamps);
        put_compact_vec(buf, &streams.headers);
        let mut len = compact_vec_len(&streams.stamps) + compact_vec_len(&streams.headers);
        if self.version == Version::V1 {
            for codes in &widths {
                put_compact_vec(buf, codes);
                len += compact_vec_len(codes);
            }
            put_compact_vec(buf, &streams.extra);
            len += compact_vec_len(&streams.extra);
        }
        tracing::trace!(bytes = len, readouts = self.readouts.len(), "saved SuperDST");
        Ok(())
    }

    /// Serialize with a leading version byte.
    pub fn to_bytes(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.version.as_u8());
        self.save(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a stream written by [`SuperDst::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVersion` for an unknown version byte and `TrailingBytes` if input
    /// remains after the stream.
    pub fn from_bytes(mut data: &[u8]) -> Result<Self, DecodeError> {
        if !data.has_remaining() {
            return Err(DecodeError::UnexpectedEob);
        }
        let version = Version::try_from(data.get_u8())?;
        let dst = Self::load(&mut data, version)?;
        if data.has_remaining() {
            return Err(DecodeError::TrailingBytes(data.remaining()));
        }
        Ok(dst)
    }

    /// Decode an untagged stream of the given version.
    pub fn load<B: Buf>(buf: &mut B, version: Version) -> Result<Self, DecodeError> {
        let dst = match version {
            Version::V0 => Self::load_v0(buf)?,
            Version::V1 => Self::load_v1(buf)?,
        };
        tracing::debug!(
            version = %version,
            readouts = dst.readouts.len(),
            "loaded SuperDST"
        );
        Ok(dst)
    }

    fn load_v0<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let stamps: Vec<u16> = get_compact_vec(buf)?;
        let headers: Vec<u16> = get_compact_vec(buf)?;
        Self::from_streams(&stamps, &headers, WidthReader::new(Default::default()), &[], Version::V0)
    }

    fn load_v1<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let stamps: Vec<u16> = get_compact_vec(buf)?;
        let headers: Vec<u16> = get_compact_vec(buf)?;
        let mut widths: [Vec<u8>; 4] = Default::default();
        for values in widths.iter_mut() {
            let codes: Vec<u8> = get_compact_vec(buf)?;
            decode_runs(&codes, stamps.len(), values)?;
        }
        let extra: Vec<u8> = get_compact_vec(buf)?;
        Self::from_streams(&stamps, &headers, WidthReader::new(widths), &extra, Version::V1)
    }

    fn from_streams(
        stamps: &[u16],
        headers: &[u16],
        mut widths: WidthReader,
        extra: &[u8],
        version: Version,
    ) -> Result<Self, DecodeError> {
        let mut reader = StampReader::new(stamps);
        let mut extra = extra.iter();
        let mut readouts = Vec::with_capacity(headers.len());
        let mut t_ref = 0u64;
        for &header in headers {
            let mut readout =
                Readout::read_streams(header, &mut reader, &mut widths, &mut extra, version)?;
            t_ref += u64::from(readout.reference_code());
            readout.set_start_time(TMIN + quantize::decode_time(t_ref, version));
            readouts.push(readout);
        }
        if reader.remaining() > 0 {
            return Err(DecodeError::MalformedData("stamps left after last readout"));
        }
        if !widths.is_exhausted() {
            return Err(DecodeError::MalformedData("width streams longer than stamp stream"));
        }
        if extra.len() > 0 {
            return Err(DecodeError::MalformedData("extra bytes left after last readout"));
        }
        Ok(Self {
            readouts,
            version,
            unpacked: OnceCell::new(),
        })
    }

    /// Bytes attributable to each sensor: header, stamp and overflow words, and extra bytes.
    /// The shared run-length width streams are not attributed.
    pub fn encoded_sizes(&self) -> BTreeMap<OmKey, usize> {
        let mut sizes = BTreeMap::new();
        let mut scratch = Streams::default();
        for r in &self.readouts {
            *sizes.entry(r.om()).or_default() += r.write_streams(&mut scratch, self.version);
        }
        sizes
    }

    /// Reconstruct approximate pulses from the readouts.
    pub fn unpack(&self) -> &PulseMap {
        self.unpacked.get_or_init(|| self.compute_unpacked())
    }

    fn compute_unpacked(&self) -> PulseMap {
        let mut pulses = PulseMap::new();
        let mut t_ref = 0u64;
        for r in &self.readouts {
            t_ref += u64::from(r.reference_code());
            let mut t = t_ref;
            let list = pulses.entry(r.om()).or_default();
            for (i, stamp) in r.stamps().iter().enumerate() {
                if i > 0 {
                    t += u64::from(stamp.timecode());
                }
                let flags = if stamp.kind().is_hlc() {
                    PulseFlags::ATWD | PulseFlags::FADC | PulseFlags::LC
                } else {
                    PulseFlags::FADC
                };
                list.push(RecoPulse::new(
                    TMIN + quantize::decode_time(t, self.version),
                    stamp.charge() as f32,
                    stamp.width() as f32,
                    flags,
                ));
            }
        }
        for list in pulses.values_mut() {
            separate_pulses(list);
        }
        pulses
    }
}

impl PartialEq for SuperDst {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.readouts == other.readouts
    }
}

/// Ensure that pulses do not overlap.
///
/// Pulses are sorted by time and keep their times. Pulses sharing a time split the leading
/// pulse's width, limited by the next distinct pulse, into equal parts. Every width is then
/// clamped to the gap to the next later pulse.
pub(crate) fn separate_pulses(pulses: &mut [RecoPulse]) {
    pulses.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut i = 0;
    while i < pulses.len() {
        let t = pulses[i].time;
        let j = i + pulses[i..].iter().take_while(|p| p.time == t).count();
        if j - i > 1 {
            let mut span = f64::from(pulses[i].width);
            if let Some(next) = pulses.get(j) {
                span = span.min(next.time - t);
            }
            let share = (span / (j - i) as f64) as f32;
            for p in &mut pulses[i..j] {
                p.width = share;
            }
        }
        i = j;
    }

    let mut next_time = f64::INFINITY;
    for i in (0..pulses.len()).rev() {
        if let Some(next) = pulses.get(i + 1) {
            if next.time > pulses[i].time {
                next_time = next.time;
            }
        }
        let gap = next_time - pulses[i].time;
        if f64::from(pulses[i].width) > gap {
            pulses[i].width = gap as f32;
        }
    }
}
