//! Wafer die mesh: fit a free-form-deformed die grid onto a wafer photo,
//! mask out defective areas and count the clean dies per label.
//!
//! The geometry core (`circle`, `mesh`, `grid`, `naming`, `mask`, `hit`,
//! `report`) has no window dependency; `session` ties it together and
//! `draw` renders it through minifb.

pub mod circle;
pub mod config;
pub mod draw;
pub mod error;
pub mod grid;
pub mod hit;
pub mod logger;
pub mod mask;
pub mod mesh;
pub mod naming;
pub mod report;
pub mod session;
pub mod types;

pub use error::Error;
pub use grid::{DieCell, DieGridCache};
pub use mesh::ControlPointMesh;
pub use report::Report;
pub use session::{InteractionMode, ModeKind, Session};
pub use types::{CircleGeom, GridIndex, ImageSize, Point, RegionRect};
