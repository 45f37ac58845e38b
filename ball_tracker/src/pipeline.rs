// THEORY:
// The `pipeline` module is the top-level API of the per-frame detection engine.
// It chains the stateless stages into one call: segment → refine → select →
// fit → size filter. It holds configuration only, never frame history, so the
// same pipeline can analyze any frame in any order.
//
// The sampling/recording policy is not part of this module; it is
// session state owned by the `tracking_loop`.

use crate::config::TrackerConfig;
use crate::core_modules::blob_selector;
use crate::core_modules::circle_fitter::{self, Detection};
use crate::core_modules::color_segmenter::{self, ColorRange};
use crate::core_modules::mask::Mask;
use crate::core_modules::mask_refiner;
use image::RgbImage;

/// What the pipeline concluded about a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// No foreground region survived refinement.
    NoTarget,
    /// The largest region fitted to a circle too small to be the target.
    BelowMinRadius(Detection),
    /// The largest region is the target.
    Accepted(Detection),
}

impl Outcome {
    /// The detection that passed the size filter, if any.
    pub fn accepted(&self) -> Option<&Detection> {
        match self {
            Outcome::Accepted(detection) => Some(detection),
            _ => None,
        }
    }
}

/// The full result of analyzing one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// The refined mask, kept for display.
    pub mask: Mask,
    pub outcome: Outcome,
}

/// The subset of `TrackerConfig` the detection stages need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub color: ColorRange,
    pub morph_kernel_size: u32,
    pub min_radius: f64,
}

impl From<&TrackerConfig> for PipelineConfig {
    fn from(cfg: &TrackerConfig) -> Self {
        Self {
            color: cfg.color,
            morph_kernel_size: cfg.morph_kernel_size,
            min_radius: cfg.min_radius,
        }
    }
}

/// Strict size filter: only radii above the threshold count.
pub fn passes_size_filter(detection: &Detection, min_radius: f64) -> bool {
    detection.radius > min_radius
}

/// The stateless detection engine.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    config: PipelineConfig,
}

impl DetectionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, frame: &RgbImage) -> FrameAnalysis {
        // Stage 1: colour segmentation
        let raw = color_segmenter::segment(frame, &self.config.color);

        // Stage 2: noise suppression
        let mask = mask_refiner::refine(&raw, self.config.morph_kernel_size);

        // Stage 3: largest candidate
        let Some(region) = blob_selector::select(&mask) else {
            return FrameAnalysis {
                mask,
                outcome: Outcome::NoTarget,
            };
        };

        // Stage 4: geometric fit and size filter
        let (top_left, bottom_right) = region.bounding_box;
        log::trace!(
            "largest region: area {}, {} foreground pixels, box ({}, {})-({}, {})",
            region.area,
            region.pixel_count,
            top_left.x,
            top_left.y,
            bottom_right.x,
            bottom_right.y
        );
        let detection = circle_fitter::fit(&region);
        let outcome = if passes_size_filter(&detection, self.config.min_radius) {
            Outcome::Accepted(detection)
        } else {
            Outcome::BelowMinRadius(detection)
        };

        FrameAnalysis { mask, outcome }
    }
}
