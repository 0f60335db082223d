#![no_main]

use libfuzzer_sys::fuzz_target;
use superdst::SuperDstTriggerSeries;

fuzz_target!(|data: &[u8]| {
    let mut src = data;
    let _ = SuperDstTriggerSeries::load(&mut src);
});
