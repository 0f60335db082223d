//! Error types for SuperDST encoding and decoding.

use thiserror::Error;

use crate::pulse::OmKey;
use crate::trigger::TriggerKey;

/// Errors raised while building or serializing a SuperDST stream.
///
/// Every variant is a hard failure for the event being encoded. Nothing is
/// written to the output when one of these is returned.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EncodeError {
    /// A time passed to the time quantizer was negative.
    #[error("time {0} ns is negative and cannot be quantized")]
    NegativeTime(f64),
    /// The earliest pulse lies before the fixed time reference.
    #[error("pulse time {time} ns is before the representable epoch {tmin} ns")]
    TimeBeforeEpoch { time: f64, tmin: f64 },
    /// A time lies too far after the epoch for a 31-bit time code.
    #[error("time {0} ns is beyond the representable range")]
    TimeNotRepresentable(f64),
    /// Widths must be positive and fit in 32 bits.
    #[error("width {0} ns is not representable")]
    InvalidWidth(f64),
    /// Requested field width is outside what the quantizer supports.
    #[error("bit width {bits} is invalid for {field}")]
    InvalidBitWidth { field: &'static str, bits: u32 },
    /// String number does not fit in the 7-bit DOM id field.
    #[error("string number {0} is not representable")]
    InvalidString(i32),
    /// OM number does not fit in the 6-bit DOM id field.
    #[error("OM number {0} is out of range [1, 64]")]
    InvalidOm(u32),
    /// A run-length coded value did not fit in a nibble.
    #[error("run value {0} does not fit in 4 bits")]
    RunValueOutOfRange(u8),
    /// Stamps in a readout were not sorted by time before relativization.
    #[error("stamp times in readout on {om} are not monotonic")]
    NonMonotonicTime { om: OmKey },
    /// A trigger length was negative or not finite.
    #[error("trigger length {0} ns is not representable")]
    NegativeLength(f64),
    /// A trigger key without a config ID that is not in the config-less allow-list.
    #[error("trigger key {0} has no config ID")]
    MissingConfigId(TriggerKey),
    /// A trigger key has no entry in the detector status trigger map.
    #[error("trigger key {0} is not in the detector status")]
    UnknownTriggerKey(TriggerKey),
}

/// Errors raised while reading a SuperDST stream.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Reached end-of-buffer unexpectedly.
    ///
    /// This may happen if you attempt to decode an empty buffer or if the buffer is too short to
    /// contain the expected value.
    #[error("unexpected end of buffer")]
    UnexpectedEob,
    /// The value read is larger than the destination type.
    #[error("decoded value overflows its destination type")]
    Overflow,
    /// The stream was written with a version this crate cannot read.
    #[error("unsupported SuperDST version {0}")]
    UnsupportedVersion(u8),
    /// The stream is structurally inconsistent.
    #[error("malformed stream: {0}")]
    MalformedData(&'static str),
    /// Input remained after a complete stream was decoded.
    #[error("{0} trailing bytes after end of stream")]
    TrailingBytes(usize),
    /// A trigger index points past the end of the supplied key list.
    #[error("trigger index {index} out of range for {len} trigger keys")]
    TriggerIndexOutOfRange { index: u64, len: usize },
    /// The key list used to resolve trigger indices is not strictly ordered.
    #[error("trigger keys are not in strictly ascending order")]
    UnorderedTriggerKeys,
}
