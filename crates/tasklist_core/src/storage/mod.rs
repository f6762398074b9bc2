use crate::error::AppError;
use crate::model::Task;
use std::fmt;

pub mod line_format;
pub mod text_store;

pub use text_store::TextFileStorage;

/// Persistence seam behind [`crate::task_store::TaskStore`].
///
/// `load` only fails on I/O; unparseable lines come back in
/// [`LoadReport::skipped`]. `save` always rewrites the whole sequence.
pub trait TaskStorage {
    fn load(&self, fallback_timestamp: &str) -> Result<LoadReport, AppError>;

    fn save(&self, tasks: &[Task]) -> Result<(), AppError>;

    /// Human-readable location, shown on startup.
    fn location(&self) -> String;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingStatusMarker,
    UnterminatedStatus,
    UnknownStatus(String),
    EmptyText,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStatusMarker => f.write_str("line does not start with '['"),
            Self::UnterminatedStatus => f.write_str("status is missing its closing ']'"),
            Self::UnknownStatus(raw) => write!(f, "unknown status '{raw}'"),
            Self::EmptyText => f.write_str("task text is empty"),
        }
    }
}
