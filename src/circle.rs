// Circumcircle through three clicked points on the wafer rim.

use crate::error::Error;
use crate::types::{CircleGeom, Point};

/// Below this the determinant is treated as zero (collinear points).
pub const COLLINEAR_EPS: f64 = 1e-10;

/// Fit the circle passing through `p1`, `p2` and `p3`.
///
/// Uses the closed-form circumcenter. Fails with
/// [`Error::DegenerateGeometry`] when the points are collinear; retrying with
/// the same points will fail the same way.
pub fn fit(p1: Point, p2: Point, p3: Point) -> Result<CircleGeom, Error> {
    let (ax, ay) = (p1.x, p1.y);
    let (bx, by) = (p2.x, p2.y);
    let (cx, cy) = (p3.x, p3.y);

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < COLLINEAR_EPS {
        return Err(Error::DegenerateGeometry);
    }

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;

    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
    let center = Point::new(ux, uy);

    Ok(CircleGeom { center, radius: center.dist(p1) })
}
