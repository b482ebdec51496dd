use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN: &str = "UNKNOWN";

/// Lifecycle state a webhook is normalized to.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Opened,
    Labeled,
    Closed,
    Unlabeled,
    Unknown,
}

impl EventType {
    /// Closed and unlabeled events carry a resolution time.
    pub fn is_resolution(&self) -> bool {
        matches!(self, EventType::Closed | EventType::Unlabeled)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EventType::Opened => "opened",
            EventType::Labeled => "labeled",
            EventType::Closed => "closed",
            EventType::Unlabeled => "unlabeled",
            EventType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Canonical event handed to the metrics store. Times are epoch seconds
/// rendered as strings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub event_time: String,
    pub time_created: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_resolved: Option<String>,
    pub id: String,
    pub title: String,
    pub message: String,
}

impl EventDto {
    pub fn unknown() -> Self {
        Self {
            event_time: UNKNOWN.to_string(),
            time_created: UNKNOWN.to_string(),
            time_resolved: Some(UNKNOWN.to_string()),
            id: UNKNOWN.to_string(),
            title: UNKNOWN.to_string(),
            message: UNKNOWN.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN
    }
}
