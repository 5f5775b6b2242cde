// Nearest-die lookup for origin picking and hover highlight.

use crate::grid::DieGridCache;
use crate::types::{GridIndex, Point, RegionRect};

/// Smallest squared pick radius in image pixels (~50 px).
pub const HIT_TOLERANCE_SQ: f64 = 2500.0;

/// Squared pick radius: the die diagonal, never below [`HIT_TOLERANCE_SQ`].
pub fn tolerance_sq(region: Option<&RegionRect>) -> f64 {
    region.map_or(HIT_TOLERANCE_SQ, |r| {
        HIT_TOLERANCE_SQ.max(r.width() * r.width() + r.height() * r.height())
    })
}

/// Die whose centroid is closest to `p`, if it lies within the tolerance
/// derived from `region`.
pub fn nearest_die(grid: &DieGridCache, p: Point, region: Option<&RegionRect>) -> Option<GridIndex> {
    let limit = tolerance_sq(region);
    grid.cells()
        .iter()
        .map(|cell| (cell.index, cell.centroid.dist_sq(p)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(_, d)| *d < limit)
        .map(|(index, _)| index)
}
