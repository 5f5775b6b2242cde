// Core value types shared by the mesh, the mask and the front end.

use std::ops::{Add, Mul, Sub};

/// A 2-D point in image coordinates (pixels, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dist_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn dist(self, other: Point) -> f64 {
        self.dist_sq(other).sqrt()
    }

    /// Straight-line blend: `t = 0` gives `self`, `t = 1` gives `other`.
    #[inline]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self * (1.0 - t) + other * t
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, o: Point) -> Point {
        Point::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, o: Point) -> Point {
        Point::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, s: f64) -> Point {
        Point::new(self.x * s, self.y * s)
    }
}

/// Pixel dimensions of the loaded wafer image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Footprint of one nominal die, drawn by the user as a drag rectangle.
/// Always normalized so that `x2 > x1` and `y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl RegionRect {
    /// Build from two drag corners in any order.
    /// Returns None for a zero-width or zero-height drag.
    pub fn from_corners(a: Point, b: Point) -> Option<Self> {
        let rect = Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        };
        if rect.width() > 0.0 && rect.height() > 0.0 {
            Some(rect)
        } else {
            None
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// The wafer's region of interest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleGeom {
    pub center: Point,
    pub radius: f64,
}

impl CircleGeom {
    /// Strict containment, the test used when counting dies.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.dist_sq(self.center) < self.radius * self.radius
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }
}

/// Logical address of one die cell (column, row) in the FFD grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridIndex {
    pub col: i64,
    pub row: i64,
}

impl GridIndex {
    pub const fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }
}

#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_corners_normalizes_any_drag_direction() {
        let r = RegionRect::from_corners(Point::new(100.0, 50.0), Point::new(0.0, 0.0)).unwrap();
        assert_eq!((r.x1, r.y1, r.x2, r.y2), (0.0, 0.0, 100.0, 50.0));
        assert_eq!(r.area(), 5000.0);
    }

    #[test]
    fn region_rejects_flat_drag() {
        assert!(RegionRect::from_corners(Point::new(3.0, 3.0), Point::new(3.0, 40.0)).is_none());
    }

    #[test]
    fn circle_contains_is_strict() {
        let c = CircleGeom { center: Point::new(0.0, 0.0), radius: 10.0 };
        assert!(c.contains(Point::new(9.99, 0.0)));
        assert!(!c.contains(Point::new(10.0, 0.0)));
    }
}
