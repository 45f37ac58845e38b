pub mod blob_selector;
pub mod circle_fitter;
pub mod color_segmenter;
pub mod hsv_pixel;
pub mod mask;
pub mod mask_refiner;
pub mod region;
pub mod sample_recorder;
