#![no_main]

use endcrypt::engine::{decode_image, normalize, GRID_SIZE};
use endcrypt::ResizeStrategy;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any decoded image must normalize onto the grid without panicking.
    if let Ok((img, _)) = decode_image(data) {
        for strategy in [ResizeStrategy::Stretch, ResizeStrategy::Letterbox] {
            if let Ok(grid) = normalize(img.clone(), GRID_SIZE, strategy) {
                assert_eq!((grid.width(), grid.height()), (GRID_SIZE, GRID_SIZE));
            }
        }
    }
});
