#![no_main]

use endcrypt::inspect_header;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = inspect_header(data);
});
