// THEORY:
// The `blob_selector` is the candidate-selection stage. It turns the refined mask
// into connected regions and keeps exactly one: the largest. The tracked object
// is assumed to be the dominant blob of its colour; every smaller same-colour
// artifact (a reflection, a patch of clothing) is discarded.
//
// Algorithm steps:
// 1.  **External contours**: `imageproc::contours::find_contours` traces every
//     border of the 8-connected foreground. Only outer borders without a parent
//     are candidates, so an island sitting inside another blob's hole never
//     competes on its own.
// 2.  **Enclosed area**: background that is not 4-connected to the frame edge is
//     a hole. Filling the holes and labelling the result with
//     `connected_components` gives each external contour the area it encloses,
//     holes included.
// 3.  **Selection**: largest enclosed area wins. Ties keep the contour traced
//     first, which is the one whose top-left pixel comes first in row-major
//     order.
//
// Like the other pipeline stages this is stateless: one mask in, at most one
// region out.

use crate::core_modules::mask::Mask;
use crate::core_modules::region::{Point, Region};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{self, Contour};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::{HashMap, HashSet};

type Labels = ImageBuffer<Luma<u32>, Vec<u32>>;

const ON: Luma<u8> = Luma([u8::MAX]);
const OFF: Luma<u8> = Luma([0]);

/// Returns the externally bounded region with the largest enclosed area.
pub fn select(mask: &Mask) -> Option<Region> {
    find_regions(mask)
        .into_iter()
        .fold(None, |best: Option<Region>, candidate| match best {
            Some(current) if current.area >= candidate.area => Some(current),
            _ => Some(candidate),
        })
}

/// Every externally bounded region of `mask`, in row-major discovery order.
pub fn find_regions(mask: &Mask) -> Vec<Region> {
    if mask.is_empty() {
        return Vec::new();
    }

    let filled = connected_components(&fill_holes(mask), Connectivity::Eight, OFF);
    let mut sizes: HashMap<u32, (usize, usize)> = HashMap::new();
    for (x, y, label) in filled.enumerate_pixels() {
        if label[0] == 0 {
            continue;
        }
        let (area, pixel_count) = sizes.entry(label[0]).or_default();
        *area += 1;
        if mask.is_set(x, y) {
            *pixel_count += 1;
        }
    }

    contours::find_contours::<i32>(mask.as_image())
        .into_iter()
        .filter(|contour| contour.parent.is_none())
        .filter_map(|contour| to_region(&contour, &filled, &sizes))
        .collect()
}

/// The mask with every enclosed background pixel switched on.
fn fill_holes(mask: &Mask) -> GrayImage {
    let background = connected_components(mask.as_image(), Connectivity::Four, ON);
    let (width, height) = background.dimensions();

    let outside: HashSet<u32> = background
        .enumerate_pixels()
        .filter(|&(x, y, _)| x == 0 || y == 0 || x + 1 == width || y + 1 == height)
        .map(|(_, _, label)| label[0])
        .filter(|&label| label != 0)
        .collect();

    GrayImage::from_fn(width, height, |x, y| {
        let label = background.get_pixel(x, y)[0];
        if label == 0 || !outside.contains(&label) { ON } else { OFF }
    })
}

fn to_region(contour: &Contour<i32>, filled: &Labels, sizes: &HashMap<u32, (usize, usize)>) -> Option<Region> {
    let boundary = contour
        .points
        .iter()
        .map(|p| Some(Point::new(u32::try_from(p.x).ok()?, u32::try_from(p.y).ok()?)))
        .collect::<Option<Vec<Point>>>()?;
    let first = boundary.first()?;
    let &(area, pixel_count) = sizes.get(&filled.get_pixel(first.x, first.y)[0])?;

    let (min, max) = boundary.iter().fold(
        (Point::new(u32::MAX, u32::MAX), Point::new(0, 0)),
        |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        },
    );

    Some(Region {
        boundary,
        area,
        pixel_count,
        bounding_box: (min, max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(cx: i64, cy: i64, r: i64) -> impl Fn(u32, u32) -> bool {
        move |x, y| {
            let dx = x as i64 - cx;
            let dy = y as i64 - cy;
            dx * dx + dy * dy <= r * r
        }
    }

    #[test]
    fn empty_mask_has_no_region() {
        assert!(select(&Mask::new(32, 32)).is_none());
        assert!(select(&Mask::new(0, 0)).is_none());
    }

    #[test]
    fn picks_the_larger_of_two_disks() {
        let small = disk(20, 20, 5);
        let large = disk(70, 60, 15);
        let mask = Mask::from_fn(100, 100, |x, y| small(x, y) || large(x, y));

        assert_eq!(find_regions(&mask).len(), 2);
        let region = select(&mask).expect("a region");
        assert_eq!(region.bounding_box, (Point::new(55, 45), Point::new(85, 75)));
        assert!(region.area > 600);
    }

    #[test]
    fn holes_count_toward_area_and_nested_islands_are_ignored() {
        // 11x11 ring with a single island pixel in its 5x5 hole.
        let mask = Mask::from_fn(20, 20, |x, y| {
            let ring = (2..=12).contains(&x) && (2..=12).contains(&y);
            let hole = (5..=9).contains(&x) && (5..=9).contains(&y);
            (ring && !hole) || (x == 7 && y == 7)
        });

        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 121);
        assert_eq!(regions[0].pixel_count, 121 - 25 + 1);
        assert!(!regions[0].boundary.contains(&Point::new(7, 7)));
        assert!(!regions[0].boundary.contains(&Point::new(4, 4)));
        assert!(regions[0].boundary.contains(&Point::new(2, 2)));
    }

    #[test]
    fn diagonal_pixels_join_one_component() {
        let mask = Mask::from_fn(6, 6, |x, y| x == y);
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 6);
    }

    #[test]
    fn equal_areas_keep_the_first_in_scan_order() {
        let mask = Mask::from_fn(30, 30, |x, y| {
            let lower_left = (2..6).contains(&x) && (20..24).contains(&y);
            let upper_right = (20..24).contains(&x) && (2..6).contains(&y);
            lower_left || upper_right
        });

        let region = select(&mask).expect("a region");
        assert_eq!(region.bounding_box.0, Point::new(20, 2));
        assert_eq!(select(&mask), select(&mask.clone()));
    }

    #[test]
    fn component_touching_frame_edge_is_external() {
        let mask = Mask::from_fn(10, 10, |x, _| x < 3);
        let region = select(&mask).expect("a region");
        assert_eq!(region.area, 30);
        assert_eq!(region.pixel_count, 30);
    }
}
