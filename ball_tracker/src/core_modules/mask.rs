// THEORY:
// A `Mask` is the binary output of the segmentation layer: one flag per frame
// pixel saying "this pixel has the target colour". It is a derived, per-frame
// value that is never persisted.
//
// It is backed by an `image::GrayImage` that stores 0 for background and 255 for
// foreground. That keeps the mask directly displayable by any viewer and lets
// the morphology and labelling stages hand it straight to `imageproc`, while
// the methods here expose it as plain booleans.

use image::{GrayImage, Luma};

const FOREGROUND: u8 = u8::MAX;
const BACKGROUND: u8 = 0;

/// A binary grid with the same dimensions as the frame it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// Creates an all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Builds a mask by evaluating `predicate` at every coordinate.
    pub fn from_fn(width: u32, height: u32, mut predicate: impl FnMut(u32, u32) -> bool) -> Self {
        let image = GrayImage::from_fn(width, height, |x, y| {
            if predicate(x, y) {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != BACKGROUND
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != BACKGROUND).count()
    }

    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == BACKGROUND)
    }

    /// Row-major view of the flags, one byte per pixel (0 or 255).
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// The displayable 0/255 grayscale image behind the mask.
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Wraps a 0/255 image produced by one of the image operators.
    pub(crate) fn from_image(image: GrayImage) -> Self {
        Self { image }
    }
}
