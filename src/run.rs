//! RunCodec: run-length coding for sequences of 4-bit values.
//!
//! Each output byte holds the value in its low nibble and one nibble of the run length in its
//! high nibble. Run lengths are written least significant nibble first; a run longer than 15
//! spills into further bytes carrying the same value. Consecutive bytes with the same value
//! therefore always belong to the same run, which the encoder guarantees by merging adjacent
//! equal values before emitting.

use crate::{DecodeError, EncodeError};

/// Largest value a run can carry.
pub const MAX_RUN_VALUE: u8 = 0xf;

fn put_run(codes: &mut Vec<u8>, value: u8, mut len: u64) {
    debug_assert!(len > 0);
    while len > 0 {
        codes.push(value | (((len & 0xf) as u8) << 4));
        len >>= 4;
    }
}

/// Run-length encode `values`, appending the codes to `codes`.
///
/// # Errors
///
/// Returns `RunValueOutOfRange` if any value does not fit in a nibble.
pub fn encode_runs(values: &[u8], codes: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut iter = values.iter().copied();
    let Some(mut current) = iter.next() else {
        return Ok(());
    };
    if current > MAX_RUN_VALUE {
        return Err(EncodeError::RunValueOutOfRange(current));
    }
    let mut len = 1u64;
    for v in iter {
        if v > MAX_RUN_VALUE {
            return Err(EncodeError::RunValueOutOfRange(v));
        }
        if v == current {
            len += 1;
        } else {
            put_run(codes, current, len);
            current = v;
            len = 1;
        }
    }
    put_run(codes, current, len);
    Ok(())
}

/// Decode run-length `codes`, appending the expanded values to `values`.
///
/// At most `limit` values are produced; a stream that expands past it is rejected instead of
/// being allocated.
///
/// # Errors
///
/// Returns `MalformedData` if a run length does not fit in 64 bits or the expansion exceeds
/// `limit`.
pub fn decode_runs(codes: &[u8], limit: usize, values: &mut Vec<u8>) -> Result<(), DecodeError> {
    let start = values.len();
    let mut iter = codes.iter().copied().peekable();
    while let Some(code) = iter.next() {
        let value = code & 0xf;
        let mut len = u64::from(code >> 4);
        let mut shift = 4u32;
        while let Some(next) = iter.next_if(|c| c & 0xf == value) {
            if shift >= u64::BITS {
                return Err(DecodeError::MalformedData("run length overflows 64 bits"));
            }
            len |= u64::from(next >> 4) << shift;
            shift += 4;
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::Overflow)?;
        if len > limit - (values.len() - start) {
            return Err(DecodeError::MalformedData("run-length stream exceeds stamp count"));
        }
        values.resize(values.len() + len, value);
    }
    Ok(())
}
