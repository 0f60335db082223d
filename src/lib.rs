//! SuperDST: a compact, lossy serialization format for optical-sensor pulse series.
//!
//! Pulses (time, charge, width) are grouped per sensor into readouts, quantized into small
//! integer codes and delta-encoded: each stamp against the previous stamp of its readout, and
//! each readout against the previous readout in time order, the first anchored at [`TMIN`].
//! The codes are bit-packed into 16-bit words. Fields that saturate spill into overflow chains
//! of whole words, so small fixed-width fields still cover the full dynamic range.
//!
//! Widths are stored separately as four run-length coded nibble streams, and the upper byte of
//! logarithmic (surface tank) charges goes into an extra-byte stream. All variable-length
//! counts use the SizeCodec tagged integer form.
//!
//! ```
//! use superdst::{OmKey, PulseFlags, PulseMap, RecoPulse, SuperDst};
//!
//! let mut pulses = PulseMap::new();
//! pulses.insert(
//!     OmKey::new(21, 30),
//!     vec![
//!         RecoPulse::new(10_000.0, 1.3, 8.0, PulseFlags::LC),
//!         RecoPulse::new(10_040.0, 0.6, 16.0, PulseFlags::LC),
//!     ],
//! );
//!
//! let dst = SuperDst::new(&pulses).unwrap();
//! let bytes = dst.to_bytes().unwrap();
//!
//! let decoded = SuperDst::from_bytes(&bytes).unwrap();
//! let first = decoded.unpack()[&OmKey::new(21, 30)][0];
//! assert!((first.time - 10_000.0).abs() <= 0.5);
//! assert!((first.charge - 1.3).abs() <= 0.026);
//! assert_eq!(first.width, 8.0);
//! ```
mod compact;
mod error;
mod pulse;
mod quantize;
mod readout;
mod run;
mod size;
mod stamp;
mod superdst;
mod trigger;
mod wire;

pub use crate::compact::{compact_vec_len, get_compact_vec, put_compact_vec, CompactElement};
pub use crate::error::{DecodeError, EncodeError};
pub use crate::pulse::{OmKey, PulseFlags, PulseMap, RecoPulse};
pub use crate::quantize::{
    decode_charge, decode_omkey, decode_time, decode_width, encode_charge, encode_omkey,
    encode_time, encode_width, ChargeFormat, Version, LOG_CHARGE_BITS,
};
pub use crate::readout::{Readout, MAX_READOUT_GAP};
pub use crate::run::{decode_runs, encode_runs, MAX_RUN_VALUE};
pub use crate::size::{size_len, EncodedSize, SizeCodecBuf, SizeCodecBufMut, MAX_SIZE_LEN};
pub use crate::stamp::{ChargeStamp, LcKind};
pub use crate::superdst::{EncoderConfig, SuperDst};
pub use crate::trigger::{
    DetectorStatus, SourceId, SuperDstTrigger, SuperDstTriggerSeries, Trigger, TriggerHierarchy,
    TriggerIter, TriggerKey, TriggerNode, TriggerStatus, TriggerType,
};
pub use crate::wire::{MAX_CHARGECODE, MAX_HEADER_TIMECODE, MAX_OVERFLOW, MAX_STAMP_TIMECODE};

/// Time reference of the first readout and trigger, in ns. Earlier pulses cannot be encoded.
pub const TMIN: f64 = -512.0;
