use super::line_format::{format_document, parse_document};
use super::{LoadReport, SkipReason, TaskStorage};
use crate::error::AppError;
use crate::model::Task;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flat text file holding one task per line.
#[derive(Debug, Clone)]
pub struct TextFileStorage {
    path: PathBuf,
}

impl TextFileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl TaskStorage for TextFileStorage {
    fn load(&self, fallback_timestamp: &str) -> Result<LoadReport, AppError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "task file missing, creating it");
            write_file(&self.path, "")?;
            return Ok(LoadReport::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|err| AppError::io(format!("{}: {}", self.path.display(), err)))?;
        let report = parse_document(&content, fallback_timestamp);

        for skipped in &report.skipped {
            match skipped.reason {
                SkipReason::MissingStatusMarker => {
                    debug!(line = skipped.line_number, "ignoring non-task line")
                }
                ref reason => warn!(line = skipped.line_number, %reason, "skipping task line"),
            }
        }
        debug!(
            path = %self.path.display(),
            tasks = report.tasks.len(),
            skipped = report.skipped.len(),
            "loaded tasks"
        );

        Ok(report)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), AppError> {
        write_file(&self.path, &format_document(tasks))?;
        debug!(path = %self.path.display(), tasks = tasks.len(), "saved tasks");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes `content` to a sibling temp file and renames it over `path`, so a
/// reader or a crash only ever sees the old list or the new one.
fn write_file(path: &Path, content: &str) -> Result<(), AppError> {
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)
            .map_err(|err| AppError::io(format!("{}: {}", parent.display(), err)))?;
    }

    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("tasks"),
        std::process::id()
    );
    let tmp_path = parent.map_or_else(|| PathBuf::from(&tmp_name), |parent| parent.join(&tmp_name));

    if let Err(err) = write_private(&tmp_path, content) {
        std::fs::remove_file(&tmp_path).ok();
        return Err(err);
    }
    std::fs::rename(&tmp_path, path).map_err(|err| {
        std::fs::remove_file(&tmp_path).ok();
        AppError::io(format!("{}: {}", path.display(), err))
    })
}

fn write_private(path: &Path, content: &str) -> Result<(), AppError> {
    let io_error = |err: std::io::Error| AppError::io(format!("{}: {}", path.display(), err));

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_error)?;
    file.write_all(content.as_bytes()).map_err(io_error)?;
    file.sync_all().map_err(io_error)?;

    // `mode` only applies when the file is created.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(io_error)?;
    }

    Ok(())
}
