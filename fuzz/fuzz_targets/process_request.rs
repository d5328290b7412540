#![no_main]

use arbitrary::Arbitrary;
use endcrypt::engine::EngineConfig;
use endcrypt::{CipherEngine, ProcessResponse};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

#[derive(Arbitrary, Debug)]
struct Request<'a> {
    level: &'a str,
    key: &'a str,
    image: &'a [u8],
}

static ENGINE: OnceLock<CipherEngine> = OnceLock::new();

fuzz_target!(|req: Request| {
    let engine = ENGINE.get_or_init(|| {
        CipherEngine::new(EngineConfig::default().with_png_optimization(false))
            .unwrap_or_default()
    });
    // Every input maps to a response; the JSON must always serialize.
    let resp = engine.respond(req.image, req.level, req.key);
    if let ProcessResponse::Success(body) = &resp {
        assert_eq!(body.metrics.decrypted_psnr, f64::INFINITY);
    }
    assert!(resp.to_json().is_ok());
});
