// The FFD control lattice and the live interpolation table it drives.
// Visual expectation: the 4x4 blue handles sit evenly over the wafer right
// after init; dragging one bends the red live grid around it.

use log::{debug, info};

use crate::error::Error;
use crate::types::{CircleGeom, ImageSize, Point, RegionRect};

/// Control lattice order (S). The mesh is always S x S.
pub const SCP_SIZE: usize = 4;
/// Bilinear patches per axis.
pub const NUM_PATCHES: usize = SCP_SIZE - 1;
/// A working dimension smaller than this share of the image is replaced...
pub const MIN_WORKING_FRACTION: f64 = 0.05;
/// ...by this share (a symmetric 5% margin).
pub const FALLBACK_WORKING_FRACTION: f64 = 1.0 - 2.0 * MIN_WORKING_FRACTION;

/// Rectangle the control lattice initially spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingRect {
    pub offset: Point,
    pub width: f64,
    pub height: f64,
}

/// Derive the working rectangle from the circle's clearance to the image edges.
pub fn working_rect(circle: &CircleGeom, image: ImageSize) -> WorkingRect {
    let (w_img, h_img) = (image.width as f64, image.height as f64);
    let (cx, cy, r) = (circle.center.x, circle.center.y, circle.radius);

    // 1) Gap between the circle's bounding box and each image edge.
    let left = (cx - r).max(0.0);
    let right = (w_img - (cx + r)).max(0.0);
    let top = (cy - r).max(0.0);
    let bottom = (h_img - (cy + r)).max(0.0);

    // 2) Shrink the image by the opposing gaps.
    let mut width = w_img - left - right;
    let mut height = h_img - top - bottom;

    // 3) A circle hugging an edge can collapse the area; fall back to 90%.
    if width < w_img * MIN_WORKING_FRACTION {
        width = w_img * FALLBACK_WORKING_FRACTION;
    }
    if height < h_img * MIN_WORKING_FRACTION {
        height = h_img * FALLBACK_WORKING_FRACTION;
    }

    WorkingRect { offset: Point::new(left, top), width, height }
}

type Lattice = [[Point; SCP_SIZE]; SCP_SIZE];

/// Patch index and local fraction for grid vertex `i` of `max` (max >= 1).
#[inline]
fn patch_coord(i: usize, max: usize) -> (usize, f64) {
    let scaled = i * NUM_PATCHES;
    let patch = (scaled / max).min(NUM_PATCHES - 1);
    let local = (scaled - patch * max) as f64 / max as f64;
    (patch, local.clamp(0.0, 1.0))
}

/// S x S control points plus the (Max_C+1) x (Max_R+1) interpolated table.
#[derive(Debug, Clone)]
pub struct ControlPointMesh {
    // lattice[r_s][c_s]
    lattice: Lattice,
    initial: Lattice,
    max_c: usize,
    max_r: usize,
    // row-major: table[r * (max_c + 1) + c]
    table: Vec<Point>,
    dirty: bool,
}

impl ControlPointMesh {
    /// Lay a uniform lattice over the working rectangle and size the die grid
    /// so that one cell matches the region rectangle.
    pub fn initialize(
        region: Option<&RegionRect>,
        circle: Option<&CircleGeom>,
        image: ImageSize,
    ) -> Result<Self, Error> {
        let circle = circle.ok_or(Error::MissingPrerequisite("define the wafer circle first"))?;
        let region = region.ok_or(Error::MissingPrerequisite("define the die rectangle first"))?;
        if image.is_empty() {
            return Err(Error::MissingPrerequisite("load an image first"));
        }
        if region.width() <= 0.0 || region.height() <= 0.0 {
            return Err(Error::MissingPrerequisite("die rectangle has no area"));
        }

        let work = working_rect(circle, image);
        let cols = (work.width / region.width()).ceil().max(1.0);
        let rows = (work.height / region.height()).ceil().max(1.0);
        // More dies than pixels means a sliver rectangle; refuse before allocating.
        if !cols.is_finite() || !rows.is_finite() || cols * rows > image.pixel_count() as f64 {
            return Err(Error::OutOfBounds(cols as i64, rows as i64));
        }
        let (max_c, max_r) = (cols as usize, rows as usize);

        let mut lattice = [[Point::default(); SCP_SIZE]; SCP_SIZE];
        for (r_s, row) in lattice.iter_mut().enumerate() {
            for (c_s, p) in row.iter_mut().enumerate() {
                let u = c_s as f64 / NUM_PATCHES as f64;
                let v = r_s as f64 / NUM_PATCHES as f64;
                *p = work.offset + Point::new(u * work.width, v * work.height);
            }
        }

        let mut mesh = Self {
            lattice,
            initial: lattice,
            max_c,
            max_r,
            table: Vec::with_capacity((max_c + 1) * (max_r + 1)),
            dirty: false,
        };
        mesh.recompute();
        info!(
            "FFD mesh initialized: {}x{} dies over {:.0}x{:.0} px at ({:.0}, {:.0})",
            max_c, max_r, work.width, work.height, work.offset.x, work.offset.y
        );
        Ok(mesh)
    }

    pub fn max_c(&self) -> usize {
        self.max_c
    }

    pub fn max_r(&self) -> usize {
        self.max_r
    }

    /// True when a control point moved since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_committed(&mut self) {
        self.dirty = false;
    }

    pub fn control_point(&self, c_s: usize, r_s: usize) -> Option<Point> {
        self.lattice.get(r_s).and_then(|row| row.get(c_s)).copied()
    }

    /// All control points with their lattice index, row by row.
    pub fn control_points(&self) -> impl Iterator<Item = ((usize, usize), Point)> + '_ {
        self.lattice
            .iter()
            .enumerate()
            .flat_map(|(r_s, row)| row.iter().enumerate().map(move |(c_s, p)| ((c_s, r_s), *p)))
    }

    /// Drag one handle to `to` and refresh the live table.
    pub fn move_control_point(&mut self, c_s: usize, r_s: usize, to: Point) -> Result<(), Error> {
        if c_s >= SCP_SIZE || r_s >= SCP_SIZE {
            return Err(Error::OutOfBounds(c_s as i64, r_s as i64));
        }
        self.lattice[r_s][c_s] = to;
        self.recompute();
        self.dirty = true;
        Ok(())
    }

    /// Put every handle back where initialization placed it.
    pub fn reset(&mut self) {
        if self.lattice != self.initial {
            self.lattice = self.initial;
            self.recompute();
            self.dirty = true;
        }
    }

    /// Closest handle within `radius` of `p`.
    pub fn pick_control_point(&self, p: Point, radius: f64) -> Option<(usize, usize)> {
        let limit = radius * radius;
        self.control_points()
            .map(|(idx, cp)| (idx, cp.dist_sq(p)))
            .filter(|(_, d)| *d <= limit)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx)
    }

    /// Bilinear FFD evaluation at grid vertex (C, R), 0 <= C <= Max_C, 0 <= R <= Max_R.
    pub fn interpolate(&self, c: usize, r: usize) -> Option<Point> {
        if c > self.max_c || r > self.max_r {
            return None;
        }
        Some(self.eval(c, r))
    }

    fn eval(&self, c: usize, r: usize) -> Point {
        // 1) Patch-space coordinate u * NUM_PATCHES with u = c / max_c, kept as
        //    the exact fraction (c * NUM_PATCHES) / max_c so patch corners
        //    land on lu/lv of exactly 0 or 1.
        let (c_s, lu) = patch_coord(c, self.max_c);
        let (r_s, lv) = patch_coord(r, self.max_r);

        // 2) Blend the patch corners.
        let p00 = self.lattice[r_s][c_s];
        let p10 = self.lattice[r_s][c_s + 1];
        let p01 = self.lattice[r_s + 1][c_s];
        let p11 = self.lattice[r_s + 1][c_s + 1];

        let top = p00.lerp(p10, lu);
        let bottom = p01.lerp(p11, lu);
        top.lerp(bottom, lv)
    }

    /// Rebuild the whole live table in place (no reallocation after the first call).
    pub fn recompute(&mut self) {
        let stride = self.max_c + 1;
        let len = stride * (self.max_r + 1);
        // Take the buffer out so `eval` can borrow self.
        let mut table = std::mem::take(&mut self.table);
        table.clear();
        table.reserve(len);
        for r in 0..=self.max_r {
            for c in 0..stride {
                table.push(self.eval(c, r));
            }
        }
        self.table = table;
        debug!("live FFD table refreshed ({} points)", len);
    }

    /// Cached live point at vertex (C, R).
    #[inline]
    pub fn point(&self, c: usize, r: usize) -> Option<Point> {
        if c > self.max_c || r > self.max_r {
            return None;
        }
        self.table.get(r * (self.max_c + 1) + c).copied()
    }
}
