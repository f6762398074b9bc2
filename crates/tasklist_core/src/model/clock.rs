use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Source of the `YYYY-MM-DD HH:MM` stamps written on new tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clock {
    Offset(UtcOffset),
    Fixed(String),
}

impl Clock {
    /// Resolves the local offset once. Must run before any other thread is
    /// spawned, otherwise `time` refuses to read the offset and UTC is used.
    pub fn local() -> Self {
        Self::Offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }

    pub fn fixed<T: Into<String>>(timestamp: T) -> Self {
        Self::Fixed(timestamp.into())
    }

    pub fn timestamp(&self) -> Result<String, AppError> {
        match self {
            Self::Offset(offset) => OffsetDateTime::now_utc()
                .to_offset(*offset)
                .format(TIMESTAMP_FORMAT)
                .map_err(|err| AppError::invalid_data(err.to_string())),
            Self::Fixed(timestamp) => Ok(timestamp.clone()),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::Clock;
    use time::UtcOffset;

    #[test]
    fn utc_clock_formats_minutes() {
        let stamp = Clock::Offset(UtcOffset::UTC).timestamp().unwrap();
        let bytes = stamp.as_bytes();

        assert_eq!(stamp.len(), 16);
        assert_eq!(bytes[4], b'-');
        assert_eq!(bytes[7], b'-');
        assert_eq!(bytes[10], b' ');
        assert_eq!(bytes[13], b':');
    }

    #[test]
    fn fixed_clock_returns_its_stamp() {
        let clock = Clock::fixed("2024-01-01 10:00");
        assert_eq!(clock.timestamp().unwrap(), "2024-01-01 10:00");
    }
}
