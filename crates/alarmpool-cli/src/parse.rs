//! Line parser for the interactive request grammar.
//!
//! One request per line:
//!
//! ```text
//! Start_Alarm(<id>): <group> <duration_s> <interval_s> <message>
//! Change_Alarm(<id>): <group> <duration_s> <interval_s> <message>
//! Cancel_Alarm(<id>)
//! Suspend_Alarm(<id>)
//! Reactivate_Alarm(<id>)
//! View_Alarms
//! ```
//!
//! Numeric fields are non-negative decimal integers; the message is at most
//! [`MESSAGE_LIMIT`] printable characters and runs to end of line.

use alarmpool_core::{ChangeRecord, Request, StartRequest};
use thiserror::Error;

/// Maximum accepted message length in characters.
pub const MESSAGE_LIMIT: usize = 64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized request")]
    UnknownCommand,
    #[error("malformed request: expected {0}")]
    Malformed(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
    },
    #[error("interval must be at least 1 second")]
    ZeroInterval,
    #[error("alarm id must be positive")]
    ZeroId,
    #[error("message is empty or not printable")]
    BadMessage,
}

/// Parse one input line typed at second `now`.
pub fn parse_line(line: &str, now: i64) -> Result<Request, ParseError> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("Start_Alarm(") {
        let (id, body) = split_head(rest, true)?;
        let (group, duration_s, interval_s, message) = parse_body(body)?;
        Ok(Request::Start(StartRequest {
            id,
            group,
            duration_s,
            interval_s,
            message,
            timestamp: now,
        }))
    } else if let Some(rest) = line.strip_prefix("Change_Alarm(") {
        let (id, body) = split_head(rest, true)?;
        let (group, duration_s, interval_s, message) = parse_body(body)?;
        Ok(Request::Change(ChangeRecord {
            id,
            group,
            duration_s,
            interval_s,
            message,
            timestamp: now,
        }))
    } else if let Some(rest) = line.strip_prefix("Cancel_Alarm(") {
        let (id, _) = split_head(rest, false)?;
        Ok(Request::Cancel { id, timestamp: now })
    } else if let Some(rest) = line.strip_prefix("Suspend_Alarm(") {
        let (id, _) = split_head(rest, false)?;
        Ok(Request::Suspend { id, timestamp: now })
    } else if let Some(rest) = line.strip_prefix("Reactivate_Alarm(") {
        let (id, _) = split_head(rest, false)?;
        Ok(Request::Resume { id, timestamp: now })
    } else if line == "View_Alarms" {
        Ok(Request::View { timestamp: now })
    } else {
        Err(ParseError::UnknownCommand)
    }
}

/// Parse `<id>)` plus either a `: body` tail or nothing.
fn split_head(rest: &str, expect_body: bool) -> Result<(u32, &str), ParseError> {
    let close = rest
        .find(')')
        .ok_or(ParseError::Malformed("closing parenthesis"))?;
    let id = parse_number("alarm id", &rest[..close])?;
    if id == 0 {
        return Err(ParseError::ZeroId);
    }
    let tail = &rest[close + 1..];
    if expect_body {
        let body = tail
            .strip_prefix(':')
            .ok_or(ParseError::Malformed("colon after alarm id"))?;
        Ok((id, body))
    } else if tail.trim().is_empty() {
        Ok((id, ""))
    } else {
        Err(ParseError::Malformed("nothing after closing parenthesis"))
    }
}

/// Parse `<group> <duration_s> <interval_s> <message...>`.
fn parse_body(body: &str) -> Result<(u32, i64, i64, String), ParseError> {
    let mut parts = body.trim_start().splitn(4, ' ');
    let group = parse_number("group", parts.next().unwrap_or(""))?;
    let duration_s = parse_number("duration", parts.next().unwrap_or(""))? as i64;
    let interval_s = parse_number("interval", parts.next().unwrap_or(""))? as i64;
    if interval_s < 1 {
        return Err(ParseError::ZeroInterval);
    }
    let message = parts
        .next()
        .map(str::trim_end)
        .filter(|m| !m.is_empty())
        .ok_or(ParseError::Malformed("message"))?;
    if message.chars().any(|c| c.is_control()) {
        return Err(ParseError::BadMessage);
    }
    let message: String = message.chars().take(MESSAGE_LIMIT).collect();
    Ok((group, duration_s, interval_s, message))
}

fn parse_number(field: &'static str, text: &str) -> Result<u32, ParseError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidNumber {
            field,
            value: text.to_string(),
        });
    }
    text.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_alarm() {
        let request = parse_line("Start_Alarm(1): 7 5 1 hello world", 100).unwrap();
        assert_eq!(
            request,
            Request::Start(StartRequest {
                id: 1,
                group: 7,
                duration_s: 5,
                interval_s: 1,
                message: "hello world".into(),
                timestamp: 100,
            })
        );
    }

    #[test]
    fn parses_change_alarm() {
        let request = parse_line("Change_Alarm(12): 4 20 2 x", 100).unwrap();
        assert_eq!(
            request,
            Request::Change(ChangeRecord {
                id: 12,
                group: 4,
                duration_s: 20,
                interval_s: 2,
                message: "x".into(),
                timestamp: 100,
            })
        );
    }

    #[test]
    fn parses_targeted_requests() {
        assert_eq!(
            parse_line("Cancel_Alarm(3)", 9).unwrap(),
            Request::Cancel { id: 3, timestamp: 9 }
        );
        assert_eq!(
            parse_line("Suspend_Alarm(3)", 9).unwrap(),
            Request::Suspend { id: 3, timestamp: 9 }
        );
        assert_eq!(
            parse_line("Reactivate_Alarm(3)", 9).unwrap(),
            Request::Resume { id: 3, timestamp: 9 }
        );
        assert_eq!(
            parse_line("View_Alarms", 9).unwrap(),
            Request::View { timestamp: 9 }
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_lines() {
        assert_eq!(parse_line("Ring_Bell(1)", 0), Err(ParseError::UnknownCommand));
        assert_eq!(
            parse_line("Start_Alarm(1) 7 5 1 hi", 0),
            Err(ParseError::Malformed("colon after alarm id"))
        );
        assert_eq!(
            parse_line("Cancel_Alarm(1): extra", 0),
            Err(ParseError::Malformed("nothing after closing parenthesis"))
        );
        assert!(matches!(
            parse_line("Start_Alarm(x): 7 5 1 hi", 0),
            Err(ParseError::InvalidNumber { field: "alarm id", .. })
        ));
        assert!(matches!(
            parse_line("Start_Alarm(1): 7 5", 0),
            Err(ParseError::InvalidNumber { field: "interval", .. })
        ));
        assert_eq!(
            parse_line("Start_Alarm(1): 7 5 1", 0),
            Err(ParseError::Malformed("message"))
        );
    }

    #[test]
    fn rejects_zero_id_and_zero_interval() {
        assert_eq!(parse_line("Cancel_Alarm(0)", 0), Err(ParseError::ZeroId));
        assert_eq!(
            parse_line("Start_Alarm(1): 7 5 0 hi", 0),
            Err(ParseError::ZeroInterval)
        );
    }

    #[test]
    fn negative_numbers_are_rejected() {
        assert!(matches!(
            parse_line("Start_Alarm(1): -7 5 1 hi", 0),
            Err(ParseError::InvalidNumber { field: "group", .. })
        ));
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "a".repeat(100);
        let request = parse_line(&format!("Start_Alarm(1): 7 5 1 {long}"), 0).unwrap();
        let Request::Start(start) = request else {
            panic!("expected a start request");
        };
        assert_eq!(start.message.len(), MESSAGE_LIMIT);
    }

    #[test]
    fn control_characters_are_rejected() {
        assert_eq!(
            parse_line("Start_Alarm(1): 7 5 1 be\u{7}ep", 0),
            Err(ParseError::BadMessage)
        );
    }
}
