#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The JSONL loader must never panic on arbitrary input: malformed
    // lines are skipped, an empty result is an error.
    for size in [1usize, 2, 8] {
        let _ = cads::dataset::Dataset::from_jsonl_reader(data, size);
    }
});
