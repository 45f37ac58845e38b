// THEORY (HSV Pixel):
// The `HsvPixel` is the smallest unit of the segmentation layer. It is a "dumb"
// data container for one pixel re-expressed in hue/saturation/value space, plus
// the conversion that produces it from an RGB sample. It has no knowledge of its
// neighbours; anything spatial lives in the mask modules.
//
// Why HSV?
// - Hue is largely invariant to lighting intensity, so a range on hue survives
//   shadows and highlights far better than a range on raw RGB.
// - Saturation separates a vivid target from grey/white clutter of similar hue.
// - Value lets very dark pixels (whose hue is numerically unstable) be rejected.
//
// Channel encoding follows the 8-bit convention used by most camera tooling
// (OpenCV `COLOR_RGB2HSV` on `u8` images):
//   • hue:        0..180, i.e. degrees / 2, so the full wheel fits in a byte
//   • saturation: 0..=255, (max - min) / max scaled to a byte
//   • value:      0..=255, max(R, G, B)
// Colour ranges in the configuration are written in this encoding.

pub type Channel = u8;

/// Number of hue steps in the 8-bit encoding (one step per two degrees).
pub const HUE_STEPS: u16 = 180;

/// A "dumb" data container representing a single pixel in 8-bit HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HsvPixel {
    /// Hue, half-degrees in `0..180`.
    pub hue: Channel,
    /// Saturation in `0..=255`.
    pub saturation: Channel,
    /// Value (brightness) in `0..=255`.
    pub value: Channel,
}

impl HsvPixel {
    pub fn new(hue: Channel, saturation: Channel, value: Channel) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Converts one RGB sample to 8-bit HSV.
    ///
    /// Achromatic pixels (R = G = B) have hue 0 and saturation 0; black has all
    /// three channels at 0.
    pub fn from_rgb(red: Channel, green: Channel, blue: Channel) -> Self {
        let max = red.max(green).max(blue);
        let min = red.min(green).min(blue);
        let chroma = (max - min) as f32;

        let value = max;
        let saturation = if max == 0 {
            0
        } else {
            (chroma * 255.0 / max as f32).round() as Channel
        };

        if chroma == 0.0 {
            return Self::new(0, saturation, value);
        }

        let (r, g, b) = (red as f32, green as f32, blue as f32);
        let mut degrees = if max == red {
            60.0 * (g - b) / chroma
        } else if max == green {
            120.0 + 60.0 * (b - r) / chroma
        } else {
            240.0 + 60.0 * (r - g) / chroma
        };
        if degrees < 0.0 {
            degrees += 360.0;
        }

        // Halve into the byte range; 359° rounds up to 180, which wraps back to 0.
        let mut hue = (degrees / 2.0).round() as u16;
        if hue >= HUE_STEPS {
            hue -= HUE_STEPS;
        }

        Self::new(hue as Channel, saturation, value)
    }

    pub fn as_array(&self) -> [Channel; 3] {
        [self.hue, self.saturation, self.value]
    }
}

impl From<image::Rgb<u8>> for HsvPixel {
    fn from(pixel: image::Rgb<u8>) -> Self {
        let [red, green, blue] = pixel.0;
        Self::from_rgb(red, green, blue)
    }
}
