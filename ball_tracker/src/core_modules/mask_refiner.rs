// THEORY:
// The `mask_refiner` cleans the raw segmentation mask before any shape analysis.
// Camera noise produces isolated "on" specks in the background and small "off"
// pinholes inside the target; both would distort blob areas and circle fits.
//
// Key architectural principles:
// 1.  **Opening then closing**: opening (erode → dilate) deletes specks smaller
//     than the structuring element; closing (dilate → erode) then fills pinholes
//     in what survived. Closing first would grow specks into blobs big enough to
//     survive the opening.
// 2.  **Square, all-true element**: an odd N×N box centred on the pixel, which is
//     the L∞ ball of radius N/2 in `imageproc::morphology`.
// 3.  **Border handling**: pixels outside the frame are ignored. They never erode
//     an edge pixel and never dilate into the frame.
// 4.  **Stateless**: pure and deterministic.

use crate::core_modules::mask::Mask;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// The default structuring-element side length.
pub const DEFAULT_KERNEL_SIZE: u32 = 5;

/// Largest side length the operators accept (an L∞ radius of 255).
pub const MAX_KERNEL_SIZE: u32 = 2 * u8::MAX as u32 + 1;

/// Opening followed by closing with a `kernel_size`² square element.
pub fn refine(mask: &Mask, kernel_size: u32) -> Mask {
    if mask.is_empty() {
        return mask.clone();
    }
    let k = kernel_radius(kernel_size);
    let opened = Mask::from_image(morphology::open(mask.as_image(), Norm::LInf, k));
    if opened.is_empty() {
        return opened;
    }
    Mask::from_image(morphology::close(opened.as_image(), Norm::LInf, k))
}

/// Half-width of an odd square kernel. Sizes past `MAX_KERNEL_SIZE` saturate.
fn kernel_radius(kernel_size: u32) -> u8 {
    u8::try_from(kernel_size / 2).unwrap_or(u8::MAX)
}
