// Committed die grid: the immutable snapshot everyone else reads.
// Visual expectation: this is the pink polygon mesh drawn inside the circle;
// it only changes when the user applies the grid, never mid-drag.

use log::info;

use crate::mesh::ControlPointMesh;
use crate::types::{GridIndex, Point};

/// One die cell of the committed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DieCell {
    pub index: GridIndex,
    /// Closed quad `[P(C,R+1), P(C+1,R+1), P(C+1,R), P(C,R)]`.
    pub polygon: [Point; 4],
    /// Mean of the four corners.
    pub centroid: Point,
}

/// Snapshot of every cell (C, R) in [0, Max_C) x [0, Max_R).
#[derive(Debug, Clone, PartialEq)]
pub struct DieGridCache {
    max_c: usize,
    max_r: usize,
    // row-major: cells[r * max_c + c]
    cells: Vec<DieCell>,
}

impl DieGridCache {
    /// Materialize the grid from the mesh's current control points.
    ///
    /// The live table is recomputed first, so the result never depends on
    /// how the table was refreshed during dragging.
    pub fn commit(mesh: &mut ControlPointMesh) -> Self {
        mesh.recompute();
        let (max_c, max_r) = (mesh.max_c(), mesh.max_r());
        let mut cells = Vec::with_capacity(max_c * max_r);

        for r in 0..max_r {
            for c in 0..max_c {
                // Every vertex of a valid cell exists in the table.
                let corner = |cc: usize, rr: usize| mesh.point(cc, rr).unwrap_or_default();
                let polygon = [corner(c, r + 1), corner(c + 1, r + 1), corner(c + 1, r), corner(c, r)];
                let centroid = (polygon[0] + polygon[1] + polygon[2] + polygon[3]) * 0.25;
                cells.push(DieCell {
                    index: GridIndex::new(c as i64, r as i64),
                    polygon,
                    centroid,
                });
            }
        }

        mesh.mark_committed();
        info!("FFD mesh committed. {} dies cached.", cells.len());
        Self { max_c, max_r, cells }
    }

    pub fn max_c(&self) -> usize {
        self.max_c
    }

    pub fn max_r(&self) -> usize {
        self.max_r
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at (C, R); None outside [0, Max_C) x [0, Max_R).
    pub fn get(&self, index: GridIndex) -> Option<&DieCell> {
        if index.col < 0 || index.row < 0 {
            return None;
        }
        let (c, r) = (index.col as usize, index.row as usize);
        if c >= self.max_c || r >= self.max_r {
            return None;
        }
        self.cells.get(r * self.max_c + c)
    }

    pub fn cells(&self) -> &[DieCell] {
        &self.cells
    }
}
