#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let _ = cads::dataset::decode_hex(&text);
    for size in 1usize..=8 {
        let _ = cads::dataset::decode_checksum_hex(&text, size);
    }
});
