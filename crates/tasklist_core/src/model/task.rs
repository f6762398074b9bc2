use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub text: String,
    pub status: TaskStatus,
    pub timestamp: String,
}

impl Task {
    pub fn pending<T: Into<String>, S: Into<String>>(text: T, timestamp: S) -> Self {
        Self {
            text: text.into(),
            status: TaskStatus::Pending,
            timestamp: timestamp.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    /// Upper-case label used both on disk and in the menu.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("pending") {
            Ok(Self::Pending)
        } else if trimmed.eq_ignore_ascii_case("completed") {
            Ok(Self::Completed)
        } else {
            Err(AppError::invalid_data(format!("unknown status '{trimmed}'")))
        }
    }
}
