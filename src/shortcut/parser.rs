use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dates::{self, DateError};
use crate::event::{EventDto, EventType};
use crate::repository::RepositoryError;
use crate::shortcut::{classify, FetchError, StoryDetail, StoryFetcher, WebhookBody};

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Missing fields in webhook body")]
    MissingFields,
    #[error("Missing story id in webhook body")]
    MissingId,
    #[error("Invalid webhook body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("Invalid date range: {0}")]
    InvalidRange(#[from] DateError),
    #[error("Failed to encode story: {0}")]
    Encode(serde_json::Error),
    #[error("Failed to fetch story: {0}")]
    Fetch(#[from] FetchError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingFields
            | WebhookError::MissingId
            | WebhookError::InvalidBody(_)
            | WebhookError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            WebhookError::Fetch(FetchError::HttpStatus(status)) if status.is_client_error() => {
                *status
            }
            WebhookError::Fetch(_) => StatusCode::BAD_GATEWAY,
            WebhookError::Encode(_) | WebhookError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Turns raw Shortcut webhooks into classified [`EventDto`]s.
#[derive(Clone)]
pub struct ShortcutParser {
    fetcher: Arc<dyn StoryFetcher>,
    incident_label_id: i64,
}

impl ShortcutParser {
    pub fn new(fetcher: Arc<dyn StoryFetcher>, incident_label_id: i64) -> Self {
        Self {
            fetcher,
            incident_label_id,
        }
    }

    pub async fn parse(&self, body: Option<&str>) -> Result<(EventType, EventDto), WebhookError> {
        self.parse_at(body, Utc::now()).await
    }

    pub async fn parse_at(
        &self,
        body: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(EventType, EventDto), WebhookError> {
        let raw = body
            .filter(|b| !b.trim().is_empty())
            .ok_or(WebhookError::MissingFields)?;

        let value: serde_json::Value = serde_json::from_str(raw)?;
        if value.as_object().map_or(true, |o| o.is_empty()) {
            return Err(WebhookError::MissingFields);
        }
        let webhook: WebhookBody = serde_json::from_value(value)?;
        debug!("webhook: {:?}", webhook);

        let story_id = webhook.story_id().ok_or(WebhookError::MissingId)?;
        let story = self.fetcher.fetch_story(story_id).await?;

        let event_type = classify(&webhook, &story, self.incident_label_id);
        info!("Story {} classified as {}", story_id, event_type);

        if event_type == EventType::Unknown {
            return Ok((event_type, EventDto::unknown()));
        }

        let dto = build_event(&webhook, &story, event_type, now)?;
        Ok((event_type, dto))
    }
}

fn build_event(
    webhook: &WebhookBody,
    story: &StoryDetail,
    event_type: EventType,
    now: DateTime<Utc>,
) -> Result<EventDto, WebhookError> {
    let event_time = webhook
        .changed_at
        .as_deref()
        .and_then(|t| dates::timestamp_to_unix(t).ok())
        .unwrap_or_else(|| now.timestamp());

    let time_created = match story.created_at.as_deref().map(dates::timestamp_to_unix) {
        Some(Ok(secs)) => secs,
        Some(Err(e)) => {
            warn!("story {} has an unreadable created_at: {}", story.id, e);
            event_time
        }
        None => event_time,
    };

    let time_resolved = event_type.is_resolution().then(|| {
        dates::resolved_or_now(
            &[
                story.completed_at_override.as_deref(),
                story.completed_at.as_deref(),
            ],
            now,
        )
        .to_string()
    });

    Ok(EventDto {
        event_time: event_time.to_string(),
        time_created: time_created.to_string(),
        time_resolved,
        id: story.id.to_string(),
        title: story.name.clone(),
        message: serde_json::to_string(story).map_err(WebhookError::Encode)?,
    })
}
