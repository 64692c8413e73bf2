//! Session-event parsing, validation, and key layout
//!
//! A session event records one workstation logon or logoff. Events arriving
//! before 05:00 belong to the previous day's business date: the window
//! 05:00:00 through 04:59:59 the next morning shares one base date.
//!
//! Examples:
//!   2025-01-01 05:00:00 -> 20250101
//!   2025-01-02 04:59:00 -> 20250101
//!   2025-01-01 04:59:00 -> 20241231

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde_json::{json, Value};
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_USERID_LEN: usize = 15;
const BASE_DATE_BOUNDARY_HOUR: u32 = 5;

/// Raw fields extracted from the incoming event, before validation
#[derive(Debug, Default)]
pub struct RawPayload {
    pub kind: Option<String>,
    pub userid: Option<String>,
    pub timestamp: Option<String>,
}

/// Extract the payload from an API Gateway proxy event (JSON string body)
/// or, for direct invocation, from the event's top-level fields.
pub fn extract_payload(event: &Value) -> RawPayload {
    if let Some(body) = event.get("body").and_then(Value::as_str) {
        if let Ok(inner) = serde_json::from_str::<Value>(body) {
            return fields_from(&inner);
        }
        // Non-JSON body falls through to the top-level fields
    }
    fields_from(event)
}

fn fields_from(value: &Value) -> RawPayload {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    RawPayload {
        kind: field("type"),
        userid: field("userid"),
        timestamp: field("timestamp"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Logon,
    Logoff,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Logon => "logon",
            EventKind::Logoff => "logoff",
        }
    }
}

/// A validated session event
#[derive(Debug)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub userid: String,
    pub timestamp: NaiveDateTime,
    /// The timestamp exactly as received, stored back into the record
    pub raw_timestamp: String,
}

impl SessionEvent {
    /// Business base date: before 05:00 the event belongs to the previous day.
    pub fn base_date(&self) -> NaiveDate {
        let date = self.timestamp.date();
        if self.timestamp.time().hour() < BASE_DATE_BOUNDARY_HOUR {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    pub fn base_date_str(&self) -> String {
        self.base_date().format("%Y%m%d").to_string()
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required fields: {0:?}")]
    MissingFields(Vec<&'static str>),

    #[error("invalid type: {0}")]
    InvalidKind(String),

    #[error("invalid userid: {0}")]
    InvalidUserid(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl ValidationError {
    /// Response body describing the failure to the caller
    pub fn to_body(&self) -> Value {
        match self {
            Self::MissingFields(missing) => json!({
                "message": "missing required fields",
                "missing": missing,
            }),
            Self::InvalidKind(value) => json!({
                "message": "invalid type",
                "allowed": ["logon", "logoff"],
                "value": value,
            }),
            Self::InvalidUserid(value) => json!({
                "message": "invalid userid",
                "rule": "alphanumeric only, length <= 15",
                "value": value,
            }),
            Self::InvalidTimestamp(value) => json!({
                "message": "invalid timestamp format",
                "expected": "YYYY-MM-DD HH:MM:SS",
                "value": value,
            }),
        }
    }
}

/// Validate a raw payload into a session event.
pub fn validate(payload: RawPayload) -> Result<SessionEvent, ValidationError> {
    let mut missing = Vec::new();
    if payload.kind.as_deref().unwrap_or("").is_empty() {
        missing.push("type");
    }
    if payload.userid.as_deref().unwrap_or("").is_empty() {
        missing.push("userid");
    }
    if payload.timestamp.as_deref().unwrap_or("").is_empty() {
        missing.push("timestamp");
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let kind_raw = payload.kind.unwrap_or_default();
    let kind = match kind_raw.as_str() {
        "logon" => EventKind::Logon,
        "logoff" => EventKind::Logoff,
        _ => return Err(ValidationError::InvalidKind(kind_raw)),
    };

    let userid = payload.userid.unwrap_or_default();
    let userid_ok = !userid.is_empty()
        && userid.len() <= MAX_USERID_LEN
        && userid.chars().all(|c| c.is_ascii_alphanumeric());
    if !userid_ok {
        return Err(ValidationError::InvalidUserid(userid));
    }

    let raw_timestamp = payload.timestamp.unwrap_or_default();
    if !has_timestamp_shape(&raw_timestamp) {
        return Err(ValidationError::InvalidTimestamp(raw_timestamp));
    }
    let timestamp = NaiveDateTime::parse_from_str(&raw_timestamp, TIMESTAMP_FORMAT)
        .map_err(|_| ValidationError::InvalidTimestamp(raw_timestamp.clone()))?;

    Ok(SessionEvent {
        kind,
        userid,
        timestamp,
        raw_timestamp,
    })
}

/// Strict zero-padded `YYYY-MM-DD HH:MM:SS` shape check; the chrono parse
/// alone accepts unpadded fields.
fn has_timestamp_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 19 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    })
}

/// Object key: `<prefix>/date=<yyyyMMdd>/<userid>_<type>_<safe_ts>.json`
pub fn object_key(prefix: &str, event: &SessionEvent) -> String {
    let safe_ts = event.raw_timestamp.replace(' ', "T").replace(':', "-");
    format!(
        "{}/date={}/{}_{}_{}.json",
        prefix,
        event.base_date_str(),
        event.userid,
        event.kind.as_str(),
        safe_ts
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(kind: &str, userid: &str, timestamp: &str) -> RawPayload {
        RawPayload {
            kind: Some(kind.to_string()),
            userid: Some(userid.to_string()),
            timestamp: Some(timestamp.to_string()),
        }
    }

    #[test]
    fn base_date_boundary() {
        let cases = [
            ("2025-01-01 05:00:00", "20250101"),
            ("2025-01-02 04:59:00", "20250101"),
            ("2025-01-01 04:59:00", "20241231"),
            ("2025-01-01 23:59:59", "20250101"),
        ];
        for (ts, expected) in cases {
            let event = validate(payload("logon", "user1", ts)).unwrap();
            assert_eq!(event.base_date_str(), expected, "timestamp {}", ts);
        }
    }

    #[test]
    fn missing_fields_are_listed() {
        let raw = RawPayload {
            kind: None,
            userid: Some(String::new()),
            timestamp: Some("2025-01-01 10:00:00".to_string()),
        };
        match validate(raw) {
            Err(ValidationError::MissingFields(missing)) => {
                assert_eq!(missing, vec!["type", "userid"]);
            }
            other => panic!("expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn kind_must_be_logon_or_logoff() {
        assert!(validate(payload("logon", "user1", "2025-01-01 10:00:00")).is_ok());
        assert!(validate(payload("logoff", "user1", "2025-01-01 10:00:00")).is_ok());
        assert!(matches!(
            validate(payload("login", "user1", "2025-01-01 10:00:00")),
            Err(ValidationError::InvalidKind(_))
        ));
    }

    #[test]
    fn userid_must_be_short_alphanumeric() {
        assert!(validate(payload("logon", "Abc123", "2025-01-01 10:00:00")).is_ok());
        assert!(validate(payload("logon", "a23456789012345", "2025-01-01 10:00:00")).is_ok());
        assert!(matches!(
            validate(payload("logon", "a234567890123456", "2025-01-01 10:00:00")),
            Err(ValidationError::InvalidUserid(_))
        ));
        assert!(matches!(
            validate(payload("logon", "user-1", "2025-01-01 10:00:00")),
            Err(ValidationError::InvalidUserid(_))
        ));
        assert!(matches!(
            validate(payload("logon", "ユーザー", "2025-01-01 10:00:00")),
            Err(ValidationError::InvalidUserid(_))
        ));
    }

    #[test]
    fn timestamp_must_be_zero_padded_and_real() {
        assert!(matches!(
            validate(payload("logon", "user1", "2025-1-1 10:00:00")),
            Err(ValidationError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            validate(payload("logon", "user1", "2025-01-01T10:00:00")),
            Err(ValidationError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            validate(payload("logon", "user1", "2025-02-30 10:00:00")),
            Err(ValidationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn extracts_from_api_gateway_body() {
        let event = json!({
            "body": "{\"type\":\"logon\",\"userid\":\"user1\",\"timestamp\":\"2025-01-01 10:00:00\"}",
            "httpMethod": "POST",
        });
        let raw = extract_payload(&event);
        assert_eq!(raw.kind.as_deref(), Some("logon"));
        assert_eq!(raw.userid.as_deref(), Some("user1"));
        assert_eq!(raw.timestamp.as_deref(), Some("2025-01-01 10:00:00"));
    }

    #[test]
    fn extracts_from_top_level_fields() {
        let event = json!({
            "type": "logoff",
            "userid": "user2",
            "timestamp": "2025-01-01 10:00:00",
        });
        let raw = extract_payload(&event);
        assert_eq!(raw.kind.as_deref(), Some("logoff"));
        assert_eq!(raw.userid.as_deref(), Some("user2"));
    }

    #[test]
    fn non_json_body_falls_back_to_top_level() {
        let event = json!({
            "body": "not json",
            "type": "logon",
            "userid": "user3",
            "timestamp": "2025-01-01 10:00:00",
        });
        let raw = extract_payload(&event);
        assert_eq!(raw.kind.as_deref(), Some("logon"));
        assert_eq!(raw.userid.as_deref(), Some("user3"));
    }

    #[test]
    fn object_key_layout() {
        let event = validate(payload("logon", "user1", "2025-01-02 04:59:00")).unwrap();
        assert_eq!(
            object_key("sessions", &event),
            "sessions/date=20250101/user1_logon_2025-01-02T04-59-00.json"
        );
    }
}
