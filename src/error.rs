// One error type for the whole crate.
// Every variant states *what* was missing or wrong; none of them is fatal,
// the caller keeps the last committed state and carries on.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The three circle points are (nearly) collinear.
    #[error("points are collinear, cannot define a circle")]
    DegenerateGeometry,

    /// A mesh or mask operation ran before its inputs were defined.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(&'static str),

    /// Accounting needs a region, a circle and a committed grid.
    #[error("define circle, die and grid before reporting")]
    IncompleteGeometry,

    /// The control mesh was dragged but the grid was not applied yet.
    #[error("control mesh has uncommitted edits, apply the grid first")]
    PendingUncommittedEdits,

    /// Grid index or pixel outside the valid range.
    #[error("index ({0}, {1}) is out of bounds")]
    OutOfBounds(i64, i64),

    #[error("image I/O failed: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("failed to write report: {0}")]
    ReportWrite(#[from] std::io::Error),

    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),
}
