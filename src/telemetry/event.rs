use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::interceptor::fragment::DirectiveSet;

/// Attack family tag. Fixed per event stream; the wire value is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    XsLeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Leak vector tags. `vector` stays an open string so adapters can report
/// new techniques without a wire change.
pub const VECTOR_STTF: &str = "STTF";

/// One detection, frozen at the moment it was observed.
///
/// `detail` carries only the directive text itself, joined by `;` — never
/// any other user payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub kind: EventKind,
    pub level: Severity,
    pub vector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: u64,
}

impl SecurityEvent {
    /// Builds the INFO event for a scroll-to-text-fragment sighting.
    pub fn sttf(directives: &DirectiveSet, path: Option<&str>) -> Self {
        SecurityEvent {
            kind: EventKind::XsLeak,
            level: Severity::Info,
            vector: VECTOR_STTF.to_string(),
            path: path.map(|p| p.to_string()),
            detail: Some(directives.join(";")),
            timestamp: epoch_millis(),
        }
    }
}

pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(values: &[&str]) -> DirectiveSet {
        DirectiveSet::new(values.iter().map(|v| v.to_string()).collect())
            .expect("non-empty test directives")
    }

    #[test]
    fn wire_shape_is_stable() {
        let event = SecurityEvent::sttf(&directives(&["secret", "two"]), Some("/docs"));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "XS_LEAK");
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["vector"], "STTF");
        assert_eq!(json["path"], "/docs");
        assert_eq!(json["detail"], "secret;two");
        assert!(json["timestamp"].is_u64());
    }

    #[test]
    fn optional_fields_are_omitted_not_null() {
        let mut event = SecurityEvent::sttf(&directives(&["x"]), None);
        event.detail = None;

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("path").is_none());
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn roundtrips_through_json() {
        let event = SecurityEvent::sttf(&directives(&["a b"]), Some("/p"));
        let back: SecurityEvent =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }
}
