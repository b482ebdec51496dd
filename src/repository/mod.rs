//! Storage for the records DORA metrics are computed from.
//!
//! Changes, deployments and incidents share one [`Record`] shape and are
//! addressed by `(kind, id)`.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::dates::{self, DateError};
use crate::event::{EventDto, EventType};

pub mod dynamodb;
pub mod memory;

pub use dynamodb::DynamoRepository;
pub use memory::InMemoryRepository;

#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Change,
    Deployment,
    Incident,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RecordKind::Change => "change",
            RecordKind::Deployment => "deployment",
            RecordKind::Incident => "incident",
        };
        f.write_str(name)
    }
}

impl FromStr for RecordKind {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change" => Ok(RecordKind::Change),
            "deployment" => Ok(RecordKind::Deployment),
            "incident" => Ok(RecordKind::Incident),
            other => Err(RepositoryError::Malformed(format!(
                "unknown record kind {}",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Record {
    pub kind: RecordKind,
    pub id: String,
    pub title: String,
    pub time_created: i64,
    pub time_resolved: Option<i64>,
    pub message: String,
}

impl Record {
    pub fn from_event(kind: RecordKind, dto: &EventDto) -> Result<Self, RepositoryError> {
        let parse = |field: &str, value: &str| {
            value.parse::<i64>().map_err(|_| {
                RepositoryError::Malformed(format!("{} is not epoch seconds: {:?}", field, value))
            })
        };
        Ok(Record {
            kind,
            id: dto.id.clone(),
            title: dto.title.clone(),
            time_created: parse("timeCreated", &dto.time_created)?,
            time_resolved: dto
                .time_resolved
                .as_deref()
                .map(|v| parse("timeResolved", v))
                .transpose()?,
            message: dto.message.clone(),
        })
    }
}

/// Inclusive bounds on `time_created`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
}

impl RecordFilter {
    /// Builds a filter from `YYYYMMDD` dates. `end` covers its whole day.
    pub fn from_dates(
        start: Option<&str>,
        end: Option<&str>,
        offset_hours: i64,
    ) -> Result<Self, DateError> {
        Ok(RecordFilter {
            created_from: start.map(|d| dates::date_to_unix(d, offset_hours)).transpose()?,
            created_to: end
                .map(|d| dates::date_to_unix(d, offset_hours).map(|s| s + 86_399))
                .transpose()?,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.created_from.map_or(true, |from| record.time_created >= from)
            && self.created_to.map_or(true, |to| record.time_created <= to)
    }
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Malformed record: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn put(&self, record: Record) -> Result<(), RepositoryError>;
    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>, RepositoryError>;
    async fn delete(&self, kind: RecordKind, id: &str) -> Result<(), RepositoryError>;
    async fn list(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, RepositoryError>;
}

/// Incident bookkeeping for a classified event.
///
/// `labeled` opens an incident. `closed` and `unlabeled` both resolve an
/// incident that already exists. Returns the record as stored, if any.
pub async fn apply_event(
    repository: &dyn Repository,
    event_type: EventType,
    dto: &EventDto,
) -> Result<Option<Record>, RepositoryError> {
    match event_type {
        EventType::Labeled => {
            let record = Record::from_event(RecordKind::Incident, dto)?;
            info!("Recording incident {}", record.id);
            repository.put(record.clone()).await?;
            Ok(Some(record))
        }
        EventType::Closed | EventType::Unlabeled => {
            let Some(mut existing) = repository.get(RecordKind::Incident, &dto.id).await? else {
                debug!("story {} {} but is not a tracked incident", dto.id, event_type);
                return Ok(None);
            };
            let resolved = Record::from_event(RecordKind::Incident, dto)?.time_resolved;
            existing.time_resolved = resolved;
            existing.message = dto.message.clone();
            info!("Resolving incident {}", existing.id);
            repository.put(existing.clone()).await?;
            Ok(Some(existing))
        }
        EventType::Opened | EventType::Unknown => Ok(None),
    }
}
