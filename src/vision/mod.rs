//! Image geometry, frame buffers and the two pure pipeline stages.
//!
//! ```text
//!   RawFrame (176×144 u8) ──extract──▶ Sample (96×96 i8) ──▶ model
//!                                                          │
//!                     Label ◀──decide── output tensor ◀────┘
//! ```

pub mod classify;
pub mod extract;

/// Width of a QCIF frame in pixels.
pub const FRAME_WIDTH: usize = 176;
/// Height of a QCIF frame in pixels.
pub const FRAME_HEIGHT: usize = 144;
/// Bytes in one grayscale frame.
pub const FRAME_LEN: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// Side of the square model input.
pub const SAMPLE_SIDE: usize = 96;
/// Values in one sample.
pub const SAMPLE_LEN: usize = SAMPLE_SIDE * SAMPLE_SIDE;

/// Left edge of the centered crop.
pub const CROP_X: usize = (FRAME_WIDTH - SAMPLE_SIDE) / 2;
/// Top edge of the centered crop.
pub const CROP_Y: usize = (FRAME_HEIGHT - SAMPLE_SIDE) / 2;

const _: () = assert!(CROP_X == 40 && CROP_Y == 24);
const _: () = assert!(CROP_X + SAMPLE_SIDE <= FRAME_WIDTH);
const _: () = assert!(CROP_Y + SAMPLE_SIDE <= FRAME_HEIGHT);

/// One model input: the InputTensor storage viewed as a fixed array.
pub type Sample = [i8; SAMPLE_LEN];

/// One grayscale camera frame.
///
/// The pixel buffer is heap-allocated once and always holds exactly
/// [`FRAME_LEN`] bytes, so every crop index is in range by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    pixels: Box<[u8]>,
}

impl RawFrame {
    /// A black frame.
    pub fn new() -> Self {
        Self::filled(0)
    }

    /// A frame with every pixel set to `value`.
    pub fn filled(value: u8) -> Self {
        Self {
            pixels: vec![value; FRAME_LEN].into_boxed_slice(),
        }
    }

    /// Build a frame from a per-pixel function of `(x, y)`.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut frame = Self::new();
        for (i, px) in frame.pixels.iter_mut().enumerate() {
            *px = f(i % FRAME_WIDTH, i / FRAME_WIDTH);
        }
        frame
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Pixel at `(x, y)`.
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * FRAME_WIDTH + x]
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RawFrame({}x{})", FRAME_WIDTH, FRAME_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_constants() {
        assert_eq!(FRAME_LEN, 25_344);
        assert_eq!(SAMPLE_LEN, 9_216);
        assert_eq!((CROP_X, CROP_Y), (40, 24));
    }

    #[test]
    fn from_fn_is_row_major() {
        let frame = RawFrame::from_fn(|x, y| (x + y) as u8);
        assert_eq!(frame.at(3, 0), 3);
        assert_eq!(frame.at(0, 5), 5);
        assert_eq!(frame.pixels()[FRAME_WIDTH + 2], 3);
        assert_eq!(frame.pixels().len(), FRAME_LEN);
    }
}
