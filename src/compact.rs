//! CompactVector: a SizeCodec element count followed by the raw little-endian elements.

use bytes::{Buf, BufMut};

use crate::size::{SizeCodecBuf, SizeCodecBufMut};
use crate::DecodeError;

/// Plain fixed-width elements that can be stored in a compact vector.
pub trait CompactElement: Sized + Copy {
    /// Encoded width of one element in bytes.
    const WIDTH: usize;

    fn put<B: BufMut>(self, buf: &mut B);

    /// Read one element. The caller guarantees `WIDTH` bytes remain.
    fn get<B: Buf>(buf: &mut B) -> Self;
}

impl CompactElement for u8 {
    const WIDTH: usize = 1;

    #[inline(always)]
    fn put<B: BufMut>(self, buf: &mut B) {
        buf.put_u8(self);
    }

    #[inline(always)]
    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8()
    }
}

impl CompactElement for u16 {
    const WIDTH: usize = 2;

    #[inline(always)]
    fn put<B: BufMut>(self, buf: &mut B) {
        buf.put_u16_le(self);
    }

    #[inline(always)]
    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_u16_le()
    }
}

/// Number of bytes `put_compact_vec` writes for `elements`.
pub fn compact_vec_len<T: CompactElement>(elements: &[T]) -> usize {
    crate::size::size_len(elements.len() as u64) + elements.len() * T::WIDTH
}

/// Write `elements` as a compact vector.
pub fn put_compact_vec<T: CompactElement, B: BufMut>(buf: &mut B, elements: &[T]) {
    buf.put_size(elements.len() as u64);
    for e in elements {
        e.put(buf);
    }
}

/// Read a compact vector.
///
/// # Errors
///
/// Returns `UnexpectedEob` if the buffer holds fewer elements than the count announces.
pub fn get_compact_vec<T: CompactElement, B: Buf>(buf: &mut B) -> Result<Vec<T>, DecodeError> {
    let count: usize = buf.get_size_as()?;
    let bytes = count.checked_mul(T::WIDTH).ok_or(DecodeError::Overflow)?;
    if bytes > buf.remaining() {
        buf.advance(buf.remaining());
        return Err(DecodeError::UnexpectedEob);
    }
    Ok((0..count).map(|_| T::get(buf)).collect())
}
