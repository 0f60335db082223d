#![no_main]

use libfuzzer_sys::fuzz_target;
use superdst::{size_len, SizeCodecBuf, SizeCodecBufMut};

fuzz_target!(|data: &[u8]| {
    let mut dst = vec![];
    for chunk in data.chunks_exact(8) {
        let mut buf = [0; 8];
        buf.copy_from_slice(chunk);
        let n = u64::from_le_bytes(buf);
        let before = dst.len();
        dst.put_size(n);
        assert_eq!(dst.len() - before, size_len(n));
    }

    let mut src = &dst[..];
    for chunk in data.chunks_exact(8) {
        let mut buf = [0; 8];
        buf.copy_from_slice(chunk);
        let n = u64::from_le_bytes(buf);
        assert_eq!(src.get_size().unwrap(), n);
    }

    let mut raw = data;
    while !raw.is_empty() {
        if raw.get_size().is_err() {
            break;
        }
    }
});
