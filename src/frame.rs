use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use crate::error::Error;

/// Grayscale video frame, rows first.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array2<u8>,
}

impl Frame {
    pub fn from_gray(pixels: Array2<u8>) -> Self {
        Self { pixels }
    }

    /// Converts a `height x width x 3` BGR image using BT.601 luma weights.
    pub fn from_bgr(bgr: ArrayView3<'_, u8>) -> Result<Self, Error> {
        if bgr.len_of(Axis(2)) != 3 {
            return Err(Error::InvalidFrame(format!(
                "expected 3 channels, got {}",
                bgr.len_of(Axis(2))
            )));
        }

        let (h, w) = (bgr.len_of(Axis(0)), bgr.len_of(Axis(1)));
        let pixels = Array2::from_shape_fn((h, w), |(y, x)| {
            let b = bgr[[y, x, 0]] as f32;
            let g = bgr[[y, x, 1]] as f32;
            let r = bgr[[y, x, 2]] as f32;

            (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8
        });

        Ok(Self { pixels })
    }

    /// (width, height)
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        let (h, w) = self.pixels.dim();
        (w, h)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn pixels(&self) -> ArrayView2<'_, u8> {
        self.pixels.view()
    }

    pub fn to_f32(&self) -> Array2<f32> {
        self.pixels.mapv(f32::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_frame_from_bgr() {
        let mut bgr = Array3::<u8>::zeros((2, 3, 3));
        bgr[[0, 0, 2]] = 255; // red
        bgr[[1, 2, 0]] = 255; // blue
        bgr[[1, 1, 0]] = 255;
        bgr[[1, 1, 1]] = 255;
        bgr[[1, 1, 2]] = 255;

        let frame = Frame::from_bgr(bgr.view()).unwrap();

        assert_eq!(frame.dims(), (3, 2));
        assert_eq!(frame.pixels()[[0, 0]], 76);
        assert_eq!(frame.pixels()[[1, 2]], 29);
        assert_eq!(frame.pixels()[[1, 1]], 255);
        assert_eq!(frame.pixels()[[0, 1]], 0);
    }

    #[test]
    fn test_frame_rejects_wrong_channels() {
        let gray = Array3::<u8>::zeros((2, 2, 1));
        assert!(matches!(
            Frame::from_bgr(gray.view()),
            Err(Error::InvalidFrame(_))
        ));
    }
}
