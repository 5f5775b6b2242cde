// Exclusion mask painted over the wafer.
// Visual expectation: a translucent green band appears under the brush, but
// never outside the red circle, no matter how far the stroke overshoots.

use log::info;

use crate::types::{CircleGeom, ImageSize, Point};

/// Alpha written by the brush. Strokes assign it, they do not accumulate.
pub const PAINT_ALPHA: u8 = 128;
/// Samples at or above this alpha count as masked.
pub const MASKED_ALPHA: u8 = 120;

/// Per-pixel alpha, same size as the image.
pub struct MaskRaster {
    width: usize,
    height: usize,
    alpha: Vec<u8>, // length = width * height
    // 1 inside the circle, 0 outside; rebuilt when the circle changes
    stencil: Option<(CircleGeom, Vec<u8>)>,
}

impl MaskRaster {
    /// Empty (fully clean) mask for an image of `size`.
    pub fn new(size: ImageSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            alpha: vec![0; size.pixel_count()],
            stencil: None,
        }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Raw alpha samples, row-major.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Paint one brush segment from `from` to `to`, then clip to `circle`.
    ///
    /// The body covers pixels whose center lies within `brush_width / 2` of the
    /// segment; a square cap of side `brush_width` is stamped at `to`.
    /// Returns false (and leaves the mask untouched) without a circle.
    pub fn paint_stroke(
        &mut self,
        from: Point,
        to: Point,
        brush_width: f64,
        circle: Option<&CircleGeom>,
    ) -> bool {
        let Some(circle) = circle else {
            return false;
        };
        if self.alpha.is_empty() {
            return false;
        }
        let half = (brush_width.max(1.0)) / 2.0;

        // 1) Only scan the stroke's bounding box (clamped to the image).
        let x0 = (from.x.min(to.x) - half).floor().max(0.0) as usize;
        let y0 = (from.y.min(to.y) - half).floor().max(0.0) as usize;
        let x1 = ((from.x.max(to.x) + half).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((from.y.max(to.y) + half).ceil().max(0.0) as usize).min(self.height);

        let seg = to - from;
        let seg_len_sq = seg.x * seg.x + seg.y * seg.y;

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);

                // 2) Square cap centered on the end point.
                let in_cap = (p.x - to.x).abs() <= half && (p.y - to.y).abs() <= half;

                // 3) Straight body: perpendicular distance, butt ends.
                let in_body = seg_len_sq > 0.0 && {
                    let t = ((p.x - from.x) * seg.x + (p.y - from.y) * seg.y) / seg_len_sq;
                    (0.0..=1.0).contains(&t) && p.dist_sq(from + seg * t) <= half * half
                };

                if in_cap || in_body {
                    self.alpha[y * self.width + x] = PAINT_ALPHA;
                }
            }
        }

        // 4) Re-clip the entire buffer so nothing survives outside the circle.
        self.clip_to(circle);
        true
    }

    /// Multiply every sample by the circle stencil.
    pub fn clip_to(&mut self, circle: &CircleGeom) {
        let stale = self.stencil.as_ref().is_none_or(|(c, _)| c != circle);
        if stale {
            self.stencil = Some((*circle, self.build_stencil(circle)));
        }
        if let Some((_, stencil)) = &self.stencil {
            for (a, s) in self.alpha.iter_mut().zip(stencil) {
                *a *= *s;
            }
        }
    }

    fn build_stencil(&self, circle: &CircleGeom) -> Vec<u8> {
        let mut stencil = vec![0u8; self.alpha.len()];
        let r2 = circle.radius * circle.radius;
        for y in 0..self.height {
            let dy = y as f64 + 0.5 - circle.center.y;
            for x in 0..self.width {
                let dx = x as f64 + 0.5 - circle.center.x;
                if dx * dx + dy * dy <= r2 {
                    stencil[y * self.width + x] = 1;
                }
            }
        }
        stencil
    }

    /// Clear the mask to 0 (nothing excluded anywhere).
    pub fn clear(&mut self) {
        self.alpha.fill(0);
        info!("Mask layer cleared.");
    }

    /// Alpha at the pixel nearest to `p` (clamped into the image).
    pub fn sample(&self, p: Point) -> u8 {
        if self.alpha.is_empty() {
            return 0;
        }
        let ix = (p.x.floor() as i64).clamp(0, self.width as i64 - 1) as usize;
        let iy = (p.y.floor() as i64).clamp(0, self.height as i64 - 1) as usize;
        self.alpha[iy * self.width + ix]
    }

    pub fn is_masked(&self, p: Point) -> bool {
        self.sample(p) >= MASKED_ALPHA
    }

    /// Masked pixels inside `circle`, scanning only its bounding box.
    pub fn masked_area_in_circle(&self, circle: &CircleGeom) -> u64 {
        let (cx, cy, r) = (circle.center.x, circle.center.y, circle.radius);
        let x0 = (cx - r).floor().max(0.0) as usize;
        let y0 = (cy - r).floor().max(0.0) as usize;
        let x1 = ((cx + r).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((cy + r).ceil().max(0.0) as usize).min(self.height);
        let r2 = r * r;

        let mut count = 0u64;
        for y in y0..y1 {
            let dy = y as f64 + 0.5 - cy;
            let row = &self.alpha[y * self.width..(y + 1) * self.width];
            for (x, &a) in row.iter().enumerate().take(x1).skip(x0) {
                let dx = x as f64 + 0.5 - cx;
                if a >= MASKED_ALPHA && dx * dx + dy * dy <= r2 {
                    count += 1;
                }
            }
        }
        count
    }

    /// Total masked samples (anywhere in the image).
    #[cfg(test)]
    pub(crate) fn masked_count(&self) -> usize {
        self.alpha.iter().filter(|&&a| a >= MASKED_ALPHA).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wafer() -> CircleGeom {
        CircleGeom { center: Point::new(100.0, 100.0), radius: 50.0 }
    }

    #[test]
    fn stroke_outside_circle_masks_nothing() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        assert!(m.paint_stroke(Point::new(5.0, 5.0), Point::new(30.0, 10.0), 8.0, Some(&wafer())));
        assert_eq!(m.masked_count(), 0);
        assert_eq!(m.masked_area_in_circle(&wafer()), 0);
    }

    #[test]
    fn stroke_inside_circle_masks_its_center() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        m.paint_stroke(Point::new(90.0, 100.0), Point::new(110.0, 100.0), 6.0, Some(&wafer()));
        assert!(m.is_masked(Point::new(100.0, 100.0)));
        assert!(m.is_masked(Point::new(90.0, 100.0)));
        assert!(!m.is_masked(Point::new(100.0, 110.0)));
        assert_eq!(m.sample(Point::new(100.0, 100.0)), PAINT_ALPHA);
    }

    #[test]
    fn overshoot_is_clipped_to_circle() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        let c = wafer();
        m.paint_stroke(Point::new(0.0, 100.0), Point::new(199.0, 100.0), 20.0, Some(&c));
        assert!(m.masked_count() > 0);
        for y in 0..200 {
            for x in 0..200 {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if m.is_masked(p) {
                    assert!(p.dist(c.center) <= c.radius);
                }
            }
        }
        assert_eq!(m.masked_area_in_circle(&c) as usize, m.masked_count());
    }

    #[test]
    fn overlapping_strokes_do_not_accumulate() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        for _ in 0..5 {
            m.paint_stroke(Point::new(100.0, 100.0), Point::new(100.0, 100.0), 10.0, Some(&wafer()));
        }
        assert_eq!(m.alpha().iter().copied().max(), Some(PAINT_ALPHA));
    }

    #[test]
    fn no_circle_is_a_no_op() {
        let mut m = MaskRaster::new(ImageSize::new(50, 50));
        assert!(!m.paint_stroke(Point::new(10.0, 10.0), Point::new(20.0, 20.0), 5.0, None));
        assert_eq!(m.masked_count(), 0);
    }

    #[test]
    fn dot_stroke_stamps_square_cap() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        m.paint_stroke(Point::new(100.0, 100.0), Point::new(100.0, 100.0), 10.0, Some(&wafer()));
        assert_eq!(m.masked_count(), 100);
        // Corner of the square is covered, which a round brush would miss.
        assert!(m.is_masked(Point::new(95.5, 95.5)));
    }

    #[test]
    fn clear_and_sample_clamp() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        m.paint_stroke(Point::new(60.0, 100.0), Point::new(60.0, 100.0), 4.0, Some(&wafer()));
        assert!(!m.is_masked(Point::new(-1000.0, 99.0)));
        m.clear();
        assert_eq!(m.masked_count(), 0);
        // Far out-of-range queries clamp to an edge pixel instead of panicking.
        assert!(!m.is_masked(Point::new(1e9, -1e9)));
    }

    #[test]
    fn redefined_circle_clips_old_strokes_on_next_paint() {
        let mut m = MaskRaster::new(ImageSize::new(200, 200));
        m.paint_stroke(Point::new(70.0, 100.0), Point::new(70.0, 100.0), 6.0, Some(&wafer()));
        assert!(m.is_masked(Point::new(70.0, 100.0)));
        let smaller = CircleGeom { center: Point::new(130.0, 100.0), radius: 20.0 };
        m.paint_stroke(Point::new(130.0, 100.0), Point::new(130.0, 100.0), 4.0, Some(&smaller));
        assert!(!m.is_masked(Point::new(70.0, 100.0)));
        assert!(m.is_masked(Point::new(130.0, 100.0)));
    }
}
