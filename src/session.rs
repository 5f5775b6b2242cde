// The single in-memory annotation session.
// Everything the front end shows is derived from this struct; there is no
// hidden global state. Pointer coordinates arrive already in image space.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::circle;
use crate::error::Error;
use crate::grid::DieGridCache;
use crate::hit;
use crate::mask::MaskRaster;
use crate::mesh::ControlPointMesh;
use crate::report::{self, AccountingInput, Report};
use crate::types::{CircleGeom, GridIndex, ImageSize, Point, RegionRect};

/// Pointer radius for grabbing a control point, in image pixels.
pub const SCP_PICK_RADIUS: f64 = 10.0;
pub const MIN_BRUSH: f64 = 1.0;
pub const MAX_BRUSH: f64 = 200.0;
pub const DEFAULT_BRUSH: f64 = 20.0;

/// Which tool the pointer drives. Requested through [`Session::set_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Idle,
    Circle,
    Rectangle,
    Mask,
    GridEdit,
    Origin,
}

impl ModeKind {
    /// Status-line text for the HUD.
    pub fn label(self) -> &'static str {
        match self {
            ModeKind::Idle => "IDLE",
            ModeKind::Circle => "CIRCLE - CLICK 3 POINTS",
            ModeKind::Rectangle => "DIE SIZE - CLICK AND DRAG",
            ModeKind::Mask => "MASK - PAINT OVER IMAGE",
            ModeKind::GridEdit => "FFD MESH - DRAG CONTROL POINTS",
            ModeKind::Origin => "NAMING ORIGIN - CLICK A DIE",
        }
    }
}

/// Active tool plus the transient pointer state only that tool uses.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionMode {
    Idle,
    Circle { points: Vec<Point> },
    Rectangle { anchor: Option<Point>, current: Option<Point> },
    Mask { last: Option<Point> },
    GridEdit { active: Option<(usize, usize)> },
    Origin,
}

impl InteractionMode {
    fn fresh(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Idle => InteractionMode::Idle,
            ModeKind::Circle => InteractionMode::Circle { points: Vec::with_capacity(3) },
            ModeKind::Rectangle => InteractionMode::Rectangle { anchor: None, current: None },
            ModeKind::Mask => InteractionMode::Mask { last: None },
            ModeKind::GridEdit => InteractionMode::GridEdit { active: None },
            ModeKind::Origin => InteractionMode::Origin,
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            InteractionMode::Idle => ModeKind::Idle,
            InteractionMode::Circle { .. } => ModeKind::Circle,
            InteractionMode::Rectangle { .. } => ModeKind::Rectangle,
            InteractionMode::Mask { .. } => ModeKind::Mask,
            InteractionMode::GridEdit { .. } => ModeKind::GridEdit,
            InteractionMode::Origin => ModeKind::Origin,
        }
    }
}

pub struct Session {
    image_size: ImageSize,
    image_name: String,
    image_path: Option<PathBuf>,
    circle: Option<CircleGeom>,
    region: Option<RegionRect>,
    mesh: Option<ControlPointMesh>,
    grid: Option<Arc<DieGridCache>>,
    mask: MaskRaster,
    origin: GridIndex,
    brush_width: f64,
    mode: InteractionMode,
}

impl Session {
    /// Fresh session for an image of `size`. `path` is only used for naming.
    pub fn new(size: ImageSize, path: Option<&Path>) -> Self {
        let mut session = Self {
            image_size: size,
            image_name: String::new(),
            image_path: None,
            circle: None,
            region: None,
            mesh: None,
            grid: None,
            mask: MaskRaster::new(size),
            origin: GridIndex::default(),
            brush_width: DEFAULT_BRUSH,
            mode: InteractionMode::Idle,
        };
        session.load_image(size, path);
        session
    }

    /// Start over on a new image. The brush width is the only thing kept.
    pub fn load_image(&mut self, size: ImageSize, path: Option<&Path>) {
        self.image_size = size;
        self.image_path = path.map(Path::to_path_buf);
        self.image_name = path
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Placeholder_Image".to_string());
        self.circle = None;
        self.region = None;
        self.mesh = None;
        self.grid = None;
        self.mask = MaskRaster::new(size);
        self.origin = GridIndex::default();
        self.mode = InteractionMode::Idle;
        info!("image loaded: {} ({}x{})", self.image_name, size.width, size.height);
    }

    /* ------------------------------- accessors ------------------------------- */

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn circle(&self) -> Option<&CircleGeom> {
        self.circle.as_ref()
    }

    pub fn region(&self) -> Option<&RegionRect> {
        self.region.as_ref()
    }

    pub fn mesh(&self) -> Option<&ControlPointMesh> {
        self.mesh.as_ref()
    }

    /// Current committed grid. The handle stays valid across later commits.
    pub fn grid(&self) -> Option<Arc<DieGridCache>> {
        self.grid.clone()
    }

    pub fn mask(&self) -> &MaskRaster {
        &self.mask
    }

    pub fn origin(&self) -> GridIndex {
        self.origin
    }

    pub fn brush_width(&self) -> f64 {
        self.brush_width
    }

    pub fn set_brush_width(&mut self, width: f64) {
        self.brush_width = width.clamp(MIN_BRUSH, MAX_BRUSH);
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// True while the control mesh has drags that were not committed.
    pub fn has_pending_edits(&self) -> bool {
        self.mesh.as_ref().is_some_and(ControlPointMesh::is_dirty)
    }

    /* ------------------------------ geometry ops ----------------------------- */

    pub fn fit_circle(&mut self, p1: Point, p2: Point, p3: Point) -> Result<CircleGeom, Error> {
        let fitted = circle::fit(p1, p2, p3)?;
        info!(
            "circle fitted: center ({:.1}, {:.1}) radius {:.1}",
            fitted.center.x, fitted.center.y, fitted.radius
        );
        self.circle = Some(fitted);
        Ok(fitted)
    }

    /// Define the nominal die footprint. The old mesh and grid are dropped;
    /// with a circle present a new mesh is built and committed right away.
    pub fn set_region(&mut self, rect: RegionRect) -> Result<(), Error> {
        self.region = Some(rect);
        self.mesh = None;
        self.grid = None;
        info!("die rectangle set: {:.1} x {:.1}", rect.width(), rect.height());
        if self.circle.is_some() {
            self.initialize_mesh()?;
        }
        Ok(())
    }

    /// Build a fresh control mesh from region + circle and commit it.
    pub fn initialize_mesh(&mut self) -> Result<(), Error> {
        let mesh =
            ControlPointMesh::initialize(self.region.as_ref(), self.circle.as_ref(), self.image_size)?;
        self.mesh = Some(mesh);
        self.grid = None;
        self.commit()?;
        Ok(())
    }

    pub fn move_control_point(&mut self, c_s: usize, r_s: usize, to: Point) -> Result<(), Error> {
        let mesh = self.mesh.as_mut().ok_or(Error::MissingPrerequisite("initialize the mesh first"))?;
        mesh.move_control_point(c_s, r_s, to)
    }

    /// Put the control points back to their initial lattice (needs a commit).
    pub fn reset_mesh(&mut self) -> Result<(), Error> {
        let mesh = self.mesh.as_mut().ok_or(Error::MissingPrerequisite("initialize the mesh first"))?;
        mesh.reset();
        Ok(())
    }

    /// Materialize the current mesh and swap it in as the committed grid.
    pub fn commit(&mut self) -> Result<Arc<DieGridCache>, Error> {
        let mesh = self.mesh.as_mut().ok_or(Error::MissingPrerequisite("initialize the mesh first"))?;
        let grid = Arc::new(DieGridCache::commit(mesh));
        self.grid = Some(Arc::clone(&grid));
        Ok(grid)
    }

    /// Paint with the current brush; silently ignored without a circle.
    pub fn paint_stroke(&mut self, from: Point, to: Point) -> bool {
        self.mask.paint_stroke(from, to, self.brush_width, self.circle.as_ref())
    }

    pub fn clear_mask(&mut self) {
        self.mask.clear();
    }

    /// Make `index` the die that starts the naming pattern.
    pub fn set_origin(&mut self, index: GridIndex) -> Result<(), Error> {
        let grid = self.grid.as_ref().ok_or(Error::MissingPrerequisite("commit the grid first"))?;
        if grid.get(index).is_none() {
            return Err(Error::OutOfBounds(index.col, index.row));
        }
        self.origin = index;
        info!("Die naming origin set to ({}, {})", index.col, index.row);
        Ok(())
    }

    pub fn nearest_die(&self, p: Point) -> Option<GridIndex> {
        self.grid.as_deref().and_then(|g| hit::nearest_die(g, p, self.region.as_ref()))
    }

    pub fn generate_report(&self) -> Result<Report, Error> {
        report::generate(&AccountingInput {
            image_name: &self.image_name,
            region: self.region.as_ref(),
            circle: self.circle.as_ref(),
            grid: self.grid.as_deref(),
            mask: &self.mask,
            origin: self.origin,
            dirty: self.has_pending_edits(),
        })
    }

    /* ------------------------------- mode table ------------------------------ */

    /// Switch tools. Leaving grid edit commits; entering it builds a mesh if
    /// there is none (reverting to idle when that fails).
    pub fn set_mode(&mut self, kind: ModeKind) -> Result<(), Error> {
        if self.mode.kind() == ModeKind::GridEdit && kind != ModeKind::GridEdit && self.mesh.is_some() {
            self.commit()?;
        }
        self.mode = InteractionMode::fresh(kind);

        if kind == ModeKind::GridEdit && self.mesh.is_none() {
            if let Err(e) = self.initialize_mesh() {
                warn!("cannot enter grid edit: {e}");
                self.mode = InteractionMode::Idle;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn pointer_down(&mut self, p: Point) -> Result<(), Error> {
        match &mut self.mode {
            InteractionMode::Idle => Ok(()),
            InteractionMode::Circle { points } => {
                points.push(p);
                if points.len() < 3 {
                    return Ok(());
                }
                let (a, b, c) = (points[0], points[1], points[2]);
                points.clear();
                self.fit_circle(a, b, c).map(|_| ())
            }
            InteractionMode::Rectangle { anchor, current } => {
                *anchor = Some(p);
                *current = Some(p);
                Ok(())
            }
            InteractionMode::Mask { last } => {
                if self.circle.is_none() {
                    return Err(Error::MissingPrerequisite("define the wafer circle first"));
                }
                *last = Some(p);
                self.paint_stroke(p, p);
                Ok(())
            }
            InteractionMode::GridEdit { active } => {
                *active = self.mesh.as_ref().and_then(|m| m.pick_control_point(p, SCP_PICK_RADIUS));
                Ok(())
            }
            InteractionMode::Origin => {
                if let Some(index) = self.nearest_die(p) {
                    self.set_origin(index)?;
                    self.mode = InteractionMode::Idle;
                }
                Ok(())
            }
        }
    }

    pub fn pointer_move(&mut self, p: Point) -> Result<(), Error> {
        match &mut self.mode {
            InteractionMode::Rectangle { anchor: Some(_), current } => {
                *current = Some(p);
                Ok(())
            }
            InteractionMode::Mask { last } => {
                if let Some(from) = last.replace(p) {
                    self.paint_stroke(from, p);
                }
                Ok(())
            }
            InteractionMode::GridEdit { active: Some((c_s, r_s)) } => {
                let (c_s, r_s) = (*c_s, *r_s);
                self.move_control_point(c_s, r_s, p)
            }
            _ => Ok(()),
        }
    }

    pub fn pointer_up(&mut self, p: Point) -> Result<(), Error> {
        match &mut self.mode {
            InteractionMode::Rectangle { anchor, current } => {
                let start = anchor.take();
                *current = None;
                match start.and_then(|a| RegionRect::from_corners(a, p)) {
                    Some(rect) => self.set_region(rect),
                    None => Ok(()),
                }
            }
            InteractionMode::Mask { last } => {
                *last = None;
                Ok(())
            }
            InteractionMode::GridEdit { active } => {
                *active = None;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_session() -> Session {
        let mut s = Session::new(ImageSize::new(1000, 1000), Some(Path::new("lot/w01.png")));
        s.fit_circle(Point::new(100.0, 500.0), Point::new(500.0, 100.0), Point::new(900.0, 500.0))
            .unwrap();
        s.set_region(RegionRect { x1: 0.0, y1: 0.0, x2: 100.0, y2: 50.0 }).unwrap();
        s
    }

    #[test]
    fn region_with_circle_builds_committed_grid() {
        let s = ready_session();
        let grid = s.grid().unwrap();
        assert_eq!((grid.max_c(), grid.max_r()), (8, 16));
        assert!(!s.has_pending_edits());
        assert_eq!(s.image_name(), "w01.png");
    }

    #[test]
    fn grid_edit_requires_circle_and_region() {
        let mut s = Session::new(ImageSize::new(200, 200), None);
        let err = s.set_mode(ModeKind::GridEdit).unwrap_err();
        assert!(matches!(err, Error::MissingPrerequisite(_)));
        assert_eq!(s.mode().kind(), ModeKind::Idle);
    }

    #[test]
    fn drag_is_invisible_until_commit() {
        let mut s = ready_session();
        s.set_mode(ModeKind::GridEdit).unwrap();
        let before = s.grid().unwrap();
        let handle = s.mesh().unwrap().control_point(1, 1).unwrap();

        s.pointer_down(handle + Point::new(2.0, 2.0)).unwrap();
        s.pointer_move(handle + Point::new(40.0, 25.0)).unwrap();
        s.pointer_up(handle + Point::new(40.0, 25.0)).unwrap();

        assert!(s.has_pending_edits());
        assert!(Arc::ptr_eq(&before, &s.grid().unwrap()));
        assert!(matches!(s.generate_report(), Err(Error::PendingUncommittedEdits)));

        // Leaving the mode applies the grid.
        s.set_mode(ModeKind::Idle).unwrap();
        assert!(!s.has_pending_edits());
        let after = s.grid().unwrap();
        assert_ne!(*before, *after);
        // Old handle still reads the old snapshot.
        assert_eq!(before.len(), after.len());
        assert!(s.generate_report().is_ok());
    }

    #[test]
    fn circle_mode_fits_after_third_click() {
        let mut s = Session::new(ImageSize::new(1000, 1000), None);
        s.set_mode(ModeKind::Circle).unwrap();
        s.pointer_down(Point::new(100.0, 500.0)).unwrap();
        s.pointer_down(Point::new(500.0, 100.0)).unwrap();
        assert!(s.circle().is_none());
        s.pointer_down(Point::new(900.0, 500.0)).unwrap();
        assert!((s.circle().unwrap().radius - 400.0).abs() < 1e-9);

        for p in [Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)] {
            let r = s.pointer_down(p);
            if p.x == 2.0 {
                assert!(matches!(r, Err(Error::DegenerateGeometry)));
            }
        }
        // The earlier good circle is kept.
        assert!((s.circle().unwrap().radius - 400.0).abs() < 1e-9);
    }

    #[test]
    fn rectangle_drag_redefines_region_and_grid() {
        let mut s = ready_session();
        s.set_mode(ModeKind::Rectangle).unwrap();
        s.pointer_down(Point::new(300.0, 300.0)).unwrap();
        s.pointer_move(Point::new(250.0, 320.0)).unwrap();
        s.pointer_up(Point::new(200.0, 400.0)).unwrap();
        let region = s.region().unwrap();
        assert_eq!((region.width(), region.height()), (100.0, 100.0));
        assert_eq!(s.grid().unwrap().max_r(), 8);
    }

    #[test]
    fn mask_mode_needs_circle() {
        let mut s = Session::new(ImageSize::new(100, 100), None);
        s.set_mode(ModeKind::Mask).unwrap();
        assert!(matches!(s.pointer_down(Point::new(50.0, 50.0)), Err(Error::MissingPrerequisite(_))));
        assert_eq!(s.mask().masked_count(), 0);
    }

    #[test]
    fn origin_mode_picks_die_and_returns_to_idle() {
        let mut s = ready_session();
        s.set_mode(ModeKind::Origin).unwrap();
        let target = s.grid().unwrap().get(GridIndex::new(3, 5)).unwrap().centroid;
        s.pointer_down(target).unwrap();
        assert_eq!(s.origin(), GridIndex::new(3, 5));
        assert_eq!(s.mode().kind(), ModeKind::Idle);
        assert!(matches!(s.set_origin(GridIndex::new(99, 0)), Err(Error::OutOfBounds(99, 0))));
    }

    #[test]
    fn mask_survives_mesh_reinit_but_not_image_reload() {
        let mut s = ready_session();
        s.paint_stroke(Point::new(500.0, 500.0), Point::new(520.0, 500.0));
        s.initialize_mesh().unwrap();
        assert!(s.mask().is_masked(Point::new(510.0, 500.0)));
        s.load_image(ImageSize::new(1000, 1000), None);
        assert_eq!(s.mask().masked_count(), 0);
        assert!(s.grid().is_none());
    }

    #[test]
    fn brush_width_is_clamped() {
        let mut s = Session::new(ImageSize::new(10, 10), None);
        s.set_brush_width(0.0);
        assert_eq!(s.brush_width(), MIN_BRUSH);
        s.set_brush_width(1e6);
        assert_eq!(s.brush_width(), MAX_BRUSH);
    }

    #[test]
    fn sliver_region_is_refused_without_a_grid() {
        let mut s = ready_session();
        let err = s.set_region(RegionRect { x1: 0.0, y1: 0.0, x2: 1e-12, y2: 50.0 }).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds(_, _)));
        assert!(s.mesh().is_none() && s.grid().is_none());
        assert!(matches!(s.generate_report(), Err(Error::IncompleteGeometry)));
    }
}
