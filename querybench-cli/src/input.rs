//! Job input parsing
//!
//! Each input line describes one query: `key,start,end`, where `key` is the
//! routing key (a hostname) and `start`/`end` are `%Y-%m-%d %H:%M:%S`
//! timestamps bounding the queried window.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Timestamp layout accepted in input lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Example input line shown in interactive mode
pub const LINE_FORMAT_EXAMPLE: &str = "host_000000,2017-01-01 00:00:00,2017-01-01 01:00:00";

/// Input line rejected by [`parse_line`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Line does not have exactly three comma-separated fields
    #[error("Invalid line: {0}")]
    InvalidLine(String),
    /// Routing key field is empty
    #[error("Missing routing key: {0}")]
    MissingKey(String),
    /// Timestamp does not match `%Y-%m-%d %H:%M:%S`
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Routing key
    pub key: String,
    /// Window start
    pub start: NaiveDateTime,
    /// Window end
    pub end: NaiveDateTime,
}

impl JobSpec {
    /// Job parameters in submission form: start then end, as written
    pub fn params(&self) -> Vec<String> {
        vec![
            self.start.format(TIMESTAMP_FORMAT).to_string(),
            self.end.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }
}

/// Parse one `key,start,end` line.
pub fn parse_line(line: &str) -> Result<JobSpec, InputError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let parts: Vec<&str> = line.split(',').collect();

    let [key, start, end] = parts.as_slice() else {
        return Err(InputError::InvalidLine(line.to_string()));
    };

    if key.is_empty() {
        return Err(InputError::MissingKey(line.to_string()));
    }

    Ok(JobSpec {
        key: key.to_string(),
        start: parse_timestamp(start)?,
        end: parse_timestamp(end)?,
    })
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, InputError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| InputError::InvalidTimestamp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_line() {
        let spec = parse_line(LINE_FORMAT_EXAMPLE).unwrap();
        assert_eq!(spec.key, "host_000000");
        assert_eq!(
            spec.params(),
            vec!["2017-01-01 00:00:00".to_string(), "2017-01-01 01:00:00".to_string()]
        );
        assert!(spec.end > spec.start);
    }

    #[test]
    fn test_crlf_line_endings() {
        let spec = parse_line("host_000001,2017-01-01 00:00:00,2017-01-01 00:10:00\r").unwrap();
        assert_eq!(spec.key, "host_000001");
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            parse_line("host_000001,2017-01-01 00:00:00"),
            Err(InputError::InvalidLine("host_000001,2017-01-01 00:00:00".to_string()))
        );
        assert!(matches!(
            parse_line("a,2017-01-01 00:00:00,2017-01-01 00:00:00,extra"),
            Err(InputError::InvalidLine(_))
        ));
    }

    #[test]
    fn test_invalid_timestamps() {
        assert_eq!(
            parse_line("host_000001,2017-01-01,2017-01-01 01:00:00"),
            Err(InputError::InvalidTimestamp("2017-01-01".to_string()))
        );
        assert_eq!(
            parse_line("host_000001,2017-01-01 00:00:00,2017-13-01 01:00:00"),
            Err(InputError::InvalidTimestamp("2017-13-01 01:00:00".to_string()))
        );
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            parse_line(",2017-01-01 00:00:00,2017-01-01 01:00:00"),
            Err(InputError::MissingKey(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = parse_line("garbage").unwrap_err();
        assert_eq!(err.to_string(), "Invalid line: garbage");
    }
}
