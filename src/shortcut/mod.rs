//! Shortcut webhook ingestion.
//!
//! A Shortcut webhook only describes *what changed*; the story itself is
//! fetched from the REST API so the event can be classified and timed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod classify;
pub mod client;
pub mod labels;
pub mod parser;

pub use classify::classify;
pub use client::{FetchError, ShortcutClient, StoryFetcher};
pub use labels::{label_present, LabelCheck};
pub use parser::{ShortcutParser, WebhookError};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WebhookBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changed_at: Option<String>,
    #[serde(default)]
    pub primary_id: Option<i64>,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl WebhookBody {
    /// Story the webhook is about: `primary_id`, else the first story action.
    pub fn story_id(&self) -> Option<i64> {
        self.primary_id.or_else(|| {
            self.actions
                .iter()
                .find(|a| a.entity_type.as_deref().map_or(true, |t| t == "story"))
                .and_then(|a| a.id)
        })
    }

    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.actions.iter().any(|a| a.action == kind)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Action {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub entity_type: Option<String>,
    pub action: ActionKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub changes: Option<Changes>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Changes {
    #[serde(default)]
    pub label_ids: Option<LabelDelta>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LabelDelta {
    #[serde(default)]
    pub adds: Vec<i64>,
    #[serde(default)]
    pub removes: Vec<i64>,
}

/// Story as returned by `GET /stories/{id}`. Fields not used for
/// classification are kept in `extra` so `message` carries the full record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoryDetail {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub completed_at_override: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoryDetail {
    pub fn is_done(&self) -> bool {
        self.completed || self.archived
    }
}
