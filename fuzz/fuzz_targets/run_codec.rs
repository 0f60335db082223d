#![no_main]

use libfuzzer_sys::fuzz_target;
use superdst::{decode_runs, encode_runs};

fuzz_target!(|data: &[u8]| {
    let values: Vec<u8> = data.iter().map(|b| b & 0xf).collect();
    let mut codes = vec![];
    encode_runs(&values, &mut codes).unwrap();
    let mut decoded = vec![];
    decode_runs(&codes, values.len(), &mut decoded).unwrap();
    assert_eq!(decoded, values);

    let mut expanded = vec![];
    let _ = decode_runs(data, 1 << 16, &mut expanded);
});
