// THEORY:
// The `circle_fitter` is the geometric stage. Given the selected region it finds
// the minimum enclosing circle: the smallest circle with every region pixel
// centre inside or on it. The result is the per-frame `Detection`.
//
// Algorithm steps:
// 1.  **Hull reduction**: the enclosing circle of a point set equals that of its
//     convex hull, so the boundary pixels are first reduced with Andrew's
//     monotone chain on exact integer coordinates.
// 2.  **Incremental fit**: the hull vertices are fed to the classic incremental
//     (Welzl-style) construction: whenever a point falls outside the current
//     circle, the circle is rebuilt with that point on its rim, using one, two
//     or three support points. Vertices are visited in a fixed strided order so
//     that consecutive hull neighbours rarely arrive back to back; the result is
//     deterministic for identical input.
// 3.  **Exact-ish arithmetic**: circumcentres are computed relative to one
//     support point, so every intermediate is an exact integer until the final
//     division. A circle whose true centre sits on a pixel centre therefore
//     comes out exactly on it.

use crate::core_modules::region::{Point, Region};

/// Relative slack when testing whether a point lies on or inside a circle.
const CONTAINS_EPSILON: f64 = 1e-12;

/// Fitted geometry of the selected region in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    /// Circle centre in pixel coordinates (x right, y down).
    pub center: (f64, f64),
    pub radius: f64,
}

/// Minimum enclosing circle of the region's external boundary.
///
/// A region always has at least one boundary pixel; an empty one yields a
/// zero-radius detection at the origin.
pub fn fit(region: &Region) -> Detection {
    fit_points(&region.boundary).unwrap_or_default()
}

/// Minimum enclosing circle of an arbitrary pixel set.
pub fn fit_points(points: &[Point]) -> Option<Detection> {
    let hull = convex_hull(points);
    if hull.is_empty() {
        return None;
    }

    let ordered = strided(&hull);
    let circle = minimum_enclosing_circle(&ordered);
    Some(Detection {
        center: (circle.cx, circle.cy),
        radius: circle.r2.sqrt(),
    })
}

type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Circle {
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Circle {
    fn at(p: Vertex) -> Self {
        Self {
            cx: p.0 as f64,
            cy: p.1 as f64,
            r2: 0.0,
        }
    }

    fn from_two(a: Vertex, b: Vertex) -> Self {
        let cx = (a.0 + b.0) as f64 / 2.0;
        let cy = (a.1 + b.1) as f64 / 2.0;
        let mut circle = Self { cx, cy, r2: 0.0 };
        circle.r2 = circle.dist2(a).max(circle.dist2(b));
        circle
    }

    /// Circumcircle of three points, or `None` when they are collinear.
    fn from_three(a: Vertex, b: Vertex, c: Vertex) -> Option<Self> {
        let (bx, by) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
        let (qx, qy) = ((c.0 - a.0) as f64, (c.1 - a.1) as f64);
        let d = 2.0 * (bx * qy - by * qx);
        if d == 0.0 {
            return None;
        }
        let b2 = bx * bx + by * by;
        let q2 = qx * qx + qy * qy;
        let ux = (qy * b2 - by * q2) / d;
        let uy = (bx * q2 - qx * b2) / d;
        let mut circle = Self {
            cx: a.0 as f64 + ux,
            cy: a.1 as f64 + uy,
            r2: 0.0,
        };
        circle.r2 = circle.dist2(a).max(circle.dist2(b)).max(circle.dist2(c));
        Some(circle)
    }

    /// Smallest circle with all three points on or inside it.
    fn enclosing_three(a: Vertex, b: Vertex, c: Vertex) -> Self {
        if let Some(circle) = Self::from_three(a, b, c) {
            return circle;
        }
        // Collinear: the two farthest-apart points form the diameter.
        [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)]
            .into_iter()
            .fold(Self::at(a), |widest, candidate| {
                if candidate.r2 > widest.r2 { candidate } else { widest }
            })
    }

    fn dist2(&self, p: Vertex) -> f64 {
        let dx = p.0 as f64 - self.cx;
        let dy = p.1 as f64 - self.cy;
        dx * dx + dy * dy
    }

    fn contains(&self, p: Vertex) -> bool {
        self.dist2(p) <= self.r2 + CONTAINS_EPSILON * self.r2.max(1.0)
    }
}

fn minimum_enclosing_circle(points: &[Vertex]) -> Circle {
    let mut circle = Circle::at(points[0]);
    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = Circle::at(points[i]);
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = Circle::from_two(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(points[k]) {
                    circle = Circle::enclosing_three(points[i], points[j], points[k]);
                }
            }
        }
    }
    circle
}

/// Convex hull vertices (counter-clockwise, no collinear points) of `points`.
fn convex_hull(points: &[Point]) -> Vec<Vertex> {
    let mut sorted: Vec<Vertex> = points.iter().map(|p| (p.x as i64, p.y as i64)).collect();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() <= 2 {
        return sorted;
    }

    let cross = |o: Vertex, a: Vertex, b: Vertex| (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0);

    let mut lower: Vec<Vertex> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Vertex> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Reorders `vertices` by a fixed stride coprime with their count.
fn strided(vertices: &[Vertex]) -> Vec<Vertex> {
    let n = vertices.len();
    let mut step = (n as f64 * 0.618).round().max(1.0) as usize;
    while gcd(step, n) != 1 {
        step += 1;
    }
    (0..n).map(|i| vertices[(i * step) % n]).collect()
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
