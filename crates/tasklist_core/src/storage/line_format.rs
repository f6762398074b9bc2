//! The `[STATUS] text - YYYY-MM-DD HH:MM` line codec.
//!
//! The text is split from the timestamp on the *last* `" - "`, so a text that
//! itself ends in `" - something"` is misread on reload. That ambiguity is
//! part of the format and is kept for compatibility with existing files.

use super::{LoadReport, SkipReason, SkippedLine};
use crate::model::{Task, TaskStatus};

const SEPARATOR: &str = " - ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Blank,
    Record(Task),
    Skipped(SkipReason),
}

pub fn parse_line(line: &str, fallback_timestamp: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Blank;
    }

    let Some(rest) = line.strip_prefix('[') else {
        return ParsedLine::Skipped(SkipReason::MissingStatusMarker);
    };
    let Some((status_raw, remainder)) = rest.split_once(']') else {
        return ParsedLine::Skipped(SkipReason::UnterminatedStatus);
    };
    let status = match status_raw.parse::<TaskStatus>() {
        Ok(status) => status,
        Err(_) => return ParsedLine::Skipped(SkipReason::UnknownStatus(status_raw.to_string())),
    };

    let remainder = remainder.strip_prefix(' ').unwrap_or(remainder);
    let (text, timestamp) = match remainder.rsplit_once(SEPARATOR) {
        Some((text, timestamp)) => (text, timestamp.to_string()),
        None => (remainder, fallback_timestamp.to_string()),
    };

    let text = text.trim();
    if text.is_empty() {
        return ParsedLine::Skipped(SkipReason::EmptyText);
    }

    ParsedLine::Record(Task {
        text: text.to_string(),
        status,
        timestamp,
    })
}

pub fn parse_document(content: &str, fallback_timestamp: &str) -> LoadReport {
    let mut report = LoadReport::default();

    for (index, line) in content.lines().enumerate() {
        match parse_line(line, fallback_timestamp) {
            ParsedLine::Blank => {}
            ParsedLine::Record(task) => report.tasks.push(task),
            ParsedLine::Skipped(reason) => report.skipped.push(SkippedLine {
                line_number: index + 1,
                reason,
            }),
        }
    }

    report
}

pub fn format_line(task: &Task) -> String {
    format!("[{}] {}{}{}", task.status, task.text, SEPARATOR, task.timestamp)
}

pub fn format_document(tasks: &[Task]) -> String {
    let mut content = String::new();
    for task in tasks {
        content.push_str(&format_line(task));
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::{ParsedLine, format_document, format_line, parse_document, parse_line};
    use crate::model::{Task, TaskStatus};
    use crate::storage::SkipReason;

    const NOW: &str = "2030-06-01 12:00";

    fn record(line: &str) -> Task {
        match parse_line(line, NOW) {
            ParsedLine::Record(task) => task,
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn parses_pending_line() {
        let task = record("[PENDING] Call Bob - 2024-01-01 10:00");

        assert_eq!(task.text, "Call Bob");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.timestamp, "2024-01-01 10:00");
    }

    #[test]
    fn status_is_case_insensitive() {
        let task = record("[completed] Ship release - 2024-02-03 08:15");
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn splits_on_last_separator() {
        let task = record("[PENDING] Buy milk - 2% fat - 2024-01-01 10:00");

        assert_eq!(task.text, "Buy milk - 2% fat");
        assert_eq!(task.timestamp, "2024-01-01 10:00");
    }

    #[test]
    fn trailing_dash_suffix_is_misread_as_timestamp() {
        let task = record("[PENDING] Plan - phase two");

        assert_eq!(task.text, "Plan");
        assert_eq!(task.timestamp, "phase two");
    }

    #[test]
    fn missing_separator_uses_fallback_timestamp() {
        let task = record("[PENDING] No date here");

        assert_eq!(task.text, "No date here");
        assert_eq!(task.timestamp, NOW);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let task = record("   [PENDING] Water plants - 2024-01-01 10:00  \r");
        assert_eq!(task.timestamp, "2024-01-01 10:00");
    }

    #[test]
    fn classifies_unusable_lines() {
        assert_eq!(parse_line("", NOW), ParsedLine::Blank);
        assert_eq!(parse_line("   ", NOW), ParsedLine::Blank);
        assert_eq!(
            parse_line("PENDING Call Bob - 2024-01-01 10:00", NOW),
            ParsedLine::Skipped(SkipReason::MissingStatusMarker)
        );
        assert_eq!(
            parse_line("[PENDING Call Bob", NOW),
            ParsedLine::Skipped(SkipReason::UnterminatedStatus)
        );
        assert_eq!(
            parse_line("[DONE] Call Bob - 2024-01-01 10:00", NOW),
            ParsedLine::Skipped(SkipReason::UnknownStatus("DONE".to_string()))
        );
        assert_eq!(
            parse_line("[PENDING]  - 2024-01-01 10:00", NOW),
            ParsedLine::Skipped(SkipReason::EmptyText)
        );
    }

    #[test]
    fn document_reports_skipped_line_numbers() {
        let content = "[PENDING] one - 2024-01-01 10:00\n\nnot a task\n[COMPLETED] two - 2024-01-02 11:00\n";
        let report = parse_document(content, NOW);

        assert_eq!(report.tasks.len(), 2);
        assert_eq!(report.tasks[1].text, "two");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line_number, 3);
        assert_eq!(report.skipped[0].reason, SkipReason::MissingStatusMarker);
    }

    #[test]
    fn formats_exact_line() {
        let task = Task {
            text: "Call Bob".to_string(),
            status: TaskStatus::Completed,
            timestamp: "2024-01-01 10:00".to_string(),
        };

        assert_eq!(format_line(&task), "[COMPLETED] Call Bob - 2024-01-01 10:00");
    }

    #[test]
    fn document_survives_reload() {
        let tasks = vec![
            Task::pending("Buy milk - 2% fat", "2024-01-01 10:00"),
            Task {
                text: "File taxes".to_string(),
                status: TaskStatus::Completed,
                timestamp: "2024-04-15 09:30".to_string(),
            },
        ];

        let content = format_document(&tasks);
        assert!(content.ends_with('\n'));

        let report = parse_document(&content, NOW);
        assert_eq!(report.tasks, tasks);
        assert!(report.skipped.is_empty());
    }
}
