#![no_main]

use libfuzzer_sys::fuzz_target;
use superdst::SuperDst;

fuzz_target!(|data: &[u8]| {
    // decode errors are ok, panics are not; anything that decodes must re-encode identically
    if let Ok(dst) = SuperDst::from_bytes(data) {
        let _ = dst.unpack();
        let bytes = dst.to_bytes().unwrap();
        let again = SuperDst::from_bytes(&bytes).unwrap();
        assert_eq!(again, dst);
    }
});
