//! SizeCodec: an unsigned integer of unknown magnitude in one tag byte plus up to eight
//! little-endian payload bytes.
//!
//! Tags below [`INLINE_LIMIT`] are the value itself. Any larger value is written as the tag
//! `0xff - n` followed by the `n` low-order bytes of the value, least significant first, where
//! `n` is the smallest byte count that holds the value.

use bytes::{Buf, BufMut};

use crate::DecodeError;

/// Maximum number of bytes a single encoded size will occupy.
pub const MAX_SIZE_LEN: usize = 1 + std::mem::size_of::<u64>();

/// Values strictly below this limit are stored in the tag byte.
pub const INLINE_LIMIT: u8 = 0xff - std::mem::size_of::<u64>() as u8;

/// Number of payload bytes needed to hold `v`.
#[inline(always)]
const fn payload_len(v: u64) -> usize {
    (64 - v.leading_zeros() as usize + 7) / 8
}

/// Return the number of bytes required to encode `v` in `[1, MAX_SIZE_LEN]`.
#[inline]
pub const fn size_len(v: u64) -> usize {
    if v < INLINE_LIMIT as u64 {
        1
    } else {
        1 + payload_len(v)
    }
}

/// A single encoded size, for callers that want the bytes without a `BufMut`.
pub struct EncodedSize {
    buf: [u8; MAX_SIZE_LEN],
    len: u8,
}

#[allow(clippy::len_without_is_empty)]
impl EncodedSize {
    pub fn new(v: u64) -> Self {
        let mut enc = Self {
            buf: [0u8; MAX_SIZE_LEN],
            len: 0,
        };
        if v < u64::from(INLINE_LIMIT) {
            enc.buf[0] = v as u8;
            enc.len = 1;
        } else {
            let n = payload_len(v);
            enc.buf[0] = 0xff - n as u8;
            enc.buf[1..=n].copy_from_slice(&v.to_le_bytes()[..n]);
            enc.len = (n + 1) as u8;
        }
        enc
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Returns the number of bytes used to encode the value.
    pub fn len(&self) -> usize {
        self.len as usize
    }
}

/// Extension for `bytes::BufMut` to write SizeCodec values.
pub trait SizeCodecBufMut {
    fn put_size(&mut self, v: u64);
}

impl<Inner: BufMut> SizeCodecBufMut for Inner {
    /// Writes `v` to the buffer in SizeCodec form.
    #[inline]
    fn put_size(&mut self, v: u64) {
        if v < u64::from(INLINE_LIMIT) {
            self.put_u8(v as u8);
        } else {
            let n = payload_len(v);
            self.put_u8(0xff - n as u8);
            self.put_uint_le(v, n);
        }
    }
}

/// Extension for `bytes::Buf` to read SizeCodec values.
pub trait SizeCodecBuf {
    /// Reads a SizeCodec value from the buffer. After a successful read, the buffer will be
    /// advanced by the number of bytes read.
    ///
    /// # Examples
    ///
    /// ```
    /// use superdst::{SizeCodecBuf, SizeCodecBufMut};
    ///
    /// let to_encode = [1u64, 246, 247, 400, u64::MAX];
    /// let mut buf = vec![];
    /// for v in &to_encode {
    ///    buf.put_size(*v);
    /// }
    ///
    /// let mut buf = &buf[..];
    /// for v in &to_encode {
    ///   assert_eq!(buf.get_size().unwrap(), *v);
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an `UnexpectedEob` error if the buffer is empty or if the buffer
    /// is not long enough to contain the full encoded value.
    fn get_size(&mut self) -> Result<u64, DecodeError>;

    /// Reads a SizeCodec value and narrows it to `T`.
    ///
    /// # Errors
    ///
    /// Returns an `Overflow` error if the value does not fit in `T`.
    fn get_size_as<T: TryFrom<u64>>(&mut self) -> Result<T, DecodeError> {
        T::try_from(self.get_size()?).map_err(|_| DecodeError::Overflow)
    }
}

impl<Inner: Buf> SizeCodecBuf for Inner {
    #[inline]
    fn get_size(&mut self) -> Result<u64, DecodeError> {
        if !self.has_remaining() {
            return Err(DecodeError::UnexpectedEob);
        }

        let tag = self.get_u8();
        if tag < INLINE_LIMIT {
            return Ok(tag.into());
        }

        let n = usize::from(0xff - tag);
        if n > self.remaining() {
            self.advance(self.remaining());
            Err(DecodeError::UnexpectedEob)
        } else if n == 0 {
            Ok(0)
        } else {
            Ok(self.get_uint_le(n))
        }
    }
}
