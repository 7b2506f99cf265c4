#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    // The .cads parser must only ever return errors, never panic.
    let _ = cads::config::CadsFile::parse(&text);
});
