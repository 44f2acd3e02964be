#![no_main]
use libfuzzer_sys::fuzz_target;
use srl_pack::{Decoder, DecoderConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(config) = DecoderConfig::builder().max_size(1 << 20).build() else {
        return;
    };
    let _ = Decoder::new(config).decode(data);
});
