#![no_main]

use arbitrary::Arbitrary;
use endcrypt::cipher::{decrypt_grid, encrypt_grid, KeyScheduler};
use endcrypt::{EncryptionLevel, PixelGrid};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    key: &'a str,
    level: u8,
    width: u8,
    gray: bool,
    samples: &'a [u8],
}

fuzz_target!(|input: Input| {
    let Some(level) = EncryptionLevel::from_code(input.level % 3 + 1) else {
        return;
    };
    let Ok(state) = KeyScheduler::default().derive(input.key, level) else {
        return;
    };
    let channels: u8 = if input.gray { 1 } else { 3 };
    let width = u32::from(input.width.max(1));
    let row = width as usize * channels as usize;
    let height = (input.samples.len() / row) as u32;
    if height == 0 {
        return;
    }
    let samples = input.samples[..row * height as usize].to_vec();
    let Ok(grid) = PixelGrid::new(width, height, channels, samples) else {
        return;
    };

    let encrypted = encrypt_grid(grid.clone(), &state).expect("encrypt");
    let decrypted = decrypt_grid(encrypted, &state).expect("decrypt");
    assert_eq!(decrypted, grid);
});
