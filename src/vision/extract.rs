//! Sample extraction: centered 96×96 crop, shifted into the signed range.
//!
//! Cropping lowers the field of view compared to downsampling but keeps the
//! transform a single pass with no arithmetic beyond the shift.  The
//! destination is the model's input tensor storage, handed over by the
//! caller as a fixed-size array, so no intermediate buffer exists.

use super::{CROP_X, CROP_Y, FRAME_WIDTH, RawFrame, SAMPLE_SIDE, Sample};

/// Convert one unsigned pixel to the model's signed input range.
#[inline]
pub const fn to_signed(px: u8) -> i8 {
    (px as i16 - 128) as i8
}

/// Write the centered crop of `frame` into `dest`, row-major.
///
/// `dest[(y - 24) * 96 + (x - 40)] = frame[y * 176 + x] - 128` for
/// `y ∈ [24, 120)`, `x ∈ [40, 136)`.
pub fn extract(frame: &RawFrame, dest: &mut Sample) {
    let pixels = frame.pixels();
    for (row, out) in dest.chunks_exact_mut(SAMPLE_SIDE).enumerate() {
        let start = (CROP_Y + row) * FRAME_WIDTH + CROP_X;
        let src = &pixels[start..start + SAMPLE_SIDE];
        for (d, &s) in out.iter_mut().zip(src) {
            *d = to_signed(s);
        }
    }
}
