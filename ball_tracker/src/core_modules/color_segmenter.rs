// THEORY:
// The `color_segmenter` is the first stage of the per-frame pipeline. It turns a
// raw RGB frame into a binary `Mask` of "target coloured" pixels.
//
// Key architectural principles:
// 1.  **Perceptual thresholding**: every pixel is converted to `HsvPixel` and the
//     test is made on (hue, saturation, value). See `hsv_pixel` for why.
// 2.  **Configured bounds**: the inclusive range comes in as a `ColorRange` value
//     from `TrackerConfig`. Nothing in here knows what colour the target is.
// 3.  **Stateless**: a pure function of the frame and the range.

use crate::core_modules::hsv_pixel::{Channel, HsvPixel};
use crate::core_modules::mask::Mask;
use image::RgbImage;

/// An inclusive, componentwise `[lower, upper]` box in 8-bit HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [Channel; 3],
    pub upper: [Channel; 3],
}

impl ColorRange {
    pub fn new(lower: [Channel; 3], upper: [Channel; 3]) -> Self {
        Self { lower, upper }
    }

    /// True when every channel of `pixel` lies within the closed bounds.
    pub fn contains(&self, pixel: HsvPixel) -> bool {
        pixel
            .as_array()
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(value, (lo, hi))| lo <= value && value <= hi)
    }
}

impl Default for ColorRange {
    /// Orange ball under indoor lighting.
    fn default() -> Self {
        Self {
            lower: [5, 100, 100],
            upper: [25, 255, 255],
        }
    }
}

/// Marks every pixel of `frame` whose HSV triple falls inside `range`.
pub fn segment(frame: &RgbImage, range: &ColorRange) -> Mask {
    Mask::from_fn(frame.width(), frame.height(), |x, y| {
        range.contains(HsvPixel::from(*frame.get_pixel(x, y)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    #[test]
    fn marks_exactly_the_in_range_block() {
        let frame = RgbImage::from_fn(40, 30, |x, y| {
            if (10..20).contains(&x) && (5..15).contains(&y) {
                ORANGE
            } else {
                BLUE
            }
        });

        let mask = segment(&frame, &ColorRange::default());

        for y in 0..30 {
            for x in 0..40 {
                let inside = (10..20).contains(&x) && (5..15).contains(&y);
                assert_eq!(mask.is_set(x, y), inside, "pixel ({x}, {y})");
            }
        }
        assert_eq!(mask.count(), 100);
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = ColorRange::new([15, 255, 255], [15, 255, 255]);
        assert!(range.contains(HsvPixel::new(15, 255, 255)));
        assert!(!range.contains(HsvPixel::new(16, 255, 255)));
        assert!(!range.contains(HsvPixel::new(15, 254, 255)));
    }

    #[test]
    fn dark_and_grey_pixels_are_rejected_by_default_range() {
        let frame = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([0, 0, 0]),
            1 => Rgb([200, 200, 200]),
            _ => Rgb([60, 30, 0]),
        });
        let mask = segment(&frame, &ColorRange::default());
        assert!(!mask.is_set(0, 0));
        assert!(!mask.is_set(1, 0));
        // Dim orange: right hue and saturation, value 60 is below 100.
        assert!(!mask.is_set(2, 0));
    }
}
