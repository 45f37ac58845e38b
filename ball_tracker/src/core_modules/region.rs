// THEORY:
// A `Region` is the spatial summary of one connected blob of target-coloured
// pixels. It is a "dumb" data container produced by the `blob_selector` and
// consumed by the `circle_fitter`; it only lives while a single frame is being
// evaluated.
//
// Only the blob's external contour matters downstream: the enclosing circle of
// a shape is decided entirely by its outer boundary, and the selection heuristic
// compares areas enclosed by that boundary. So the region keeps its outer
// boundary pixels and the enclosed area, not the full pixel list.

/// A pixel coordinate in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// One externally bounded connected component of a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Pixels of the external contour, in tracing order.
    pub boundary: Vec<Point>,
    /// Pixels enclosed by the external contour, interior holes included.
    pub area: usize,
    /// Foreground pixels belonging to the component itself.
    pub pixel_count: usize,
    /// Top-left and bottom-right corners of the enclosing box.
    pub bounding_box: (Point, Point),
}
