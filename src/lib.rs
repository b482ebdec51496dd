use std::sync::Arc;

use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::encodings::Body;
use base64::prelude::*;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use lambda_runtime::{Error, LambdaEvent};
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::clients::AwsClients;
use crate::config::{Config, RepositoryType};
use crate::repository::{
    DynamoRepository, InMemoryRepository, RecordFilter, RecordKind, Repository,
};
use crate::shortcut::{ShortcutClient, ShortcutParser, WebhookError};

pub mod clients;
pub mod config;
pub mod dates;
pub mod event;
pub mod repository;
pub mod shortcut;

pub fn set_up_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
}

/// Everything an invocation needs, built once per cold start.
#[derive(Clone)]
pub struct App {
    pub parser: ShortcutParser,
    pub repository: Arc<dyn Repository>,
    // hours; applied sign-flipped, see dates::date_to_unix
    pub timezone_offset: i64,
}

impl App {
    pub fn new(
        parser: ShortcutParser,
        repository: Arc<dyn Repository>,
        timezone_offset: i64,
    ) -> Self {
        Self {
            parser,
            repository,
            timezone_offset,
        }
    }

    pub fn from_config(config: &Config, clients: &AwsClients) -> Result<Self, Error> {
        let fetcher = Arc::new(ShortcutClient::from_config(config)?);
        let parser = ShortcutParser::new(fetcher, config.incident_label_id);
        Ok(Self::new(
            parser,
            set_up_repository(config, clients),
            config.timezone_offset,
        ))
    }
}

pub fn set_up_repository(config: &Config, clients: &AwsClients) -> Arc<dyn Repository> {
    match (config.repository_type, config.events_table.as_deref()) {
        (RepositoryType::DynamoDb, Some(table)) => {
            info!("Using DynamoDB table {}", table);
            Arc::new(DynamoRepository::new(clients.dynamodb.clone(), table))
        }
        _ => {
            info!("Using in-memory repository");
            Arc::new(InMemoryRepository::new())
        }
    }
}

// lambda handler
pub async fn function_handler(
    app: &App,
    evt: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, Error> {
    info!("Handling lambda invocation");
    debug!("Handling event payload: {:?}", evt.payload);

    if evt.payload.http_method == Method::GET {
        return Ok(match list_incidents(app, &evt.payload).await {
            Ok(response) => respond(StatusCode::OK, response),
            Err(e) => {
                let status = e.status_code();
                error!(error = %e, status = status.as_u16(), "Failed to list incidents");
                respond(status, json!({ "error": e.to_string() }))
            }
        });
    }

    let body = match request_body(&evt.payload) {
        Ok(body) => body,
        Err(e) => {
            return Ok(respond(
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("undecodable body - {}", e) }),
            ))
        }
    };

    match handle_webhook(app, body.as_deref()).await {
        Ok(response) => Ok(respond(StatusCode::OK, response)),
        Err(e) => {
            let status = e.status_code();
            error!(error = %e, status = status.as_u16(), "Failed to handle webhook");
            Ok(respond(status, json!({ "error": e.to_string() })))
        }
    }
}

async fn handle_webhook(app: &App, body: Option<&str>) -> Result<serde_json::Value, WebhookError> {
    let (event_type, dto) = app.parser.parse(body).await?;
    repository::apply_event(app.repository.as_ref(), event_type, &dto).await?;
    Ok(json!({ "eventType": event_type, "event": dto }))
}

/// Incidents created between the `start` and `end` query dates (`YYYYMMDD`,
/// both optional), bucketed by day with the configured offset.
async fn list_incidents(
    app: &App,
    request: &ApiGatewayProxyRequest,
) -> Result<serde_json::Value, WebhookError> {
    let query = &request.query_string_parameters;
    let filter = RecordFilter::from_dates(
        query.first("start"),
        query.first("end"),
        app.timezone_offset,
    )?;
    let records = app.repository.list(RecordKind::Incident, &filter).await?;
    debug!("{} incidents match {:?}", records.len(), filter);

    let incidents: Vec<_> = records
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "title": record.title,
                "day": dates::epoch_to_date(record.time_created, app.timezone_offset),
                "timeCreated": record.time_created,
                "timeResolved": record.time_resolved,
            })
        })
        .collect();
    Ok(json!({ "incidents": incidents }))
}

fn request_body(request: &ApiGatewayProxyRequest) -> Result<Option<String>, Error> {
    match &request.body {
        Some(body) if request.is_base64_encoded => {
            let bytes = BASE64_STANDARD.decode(body.trim())?;
            Ok(Some(String::from_utf8(bytes)?))
        }
        other => Ok(other.clone()),
    }
}

fn respond(status: StatusCode, body: serde_json::Value) -> ApiGatewayProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    ApiGatewayProxyResponse {
        status_code: status.as_u16() as i64,
        headers,
        body: Some(Body::Text(body.to_string())),
        ..Default::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_body_plain_and_base64() {
        let plain = ApiGatewayProxyRequest {
            body: Some(r#"{"primary_id": 1}"#.to_string()),
            ..Default::default()
        };
        assert_eq!(
            request_body(&plain).unwrap().as_deref(),
            Some(r#"{"primary_id": 1}"#)
        );

        let encoded = ApiGatewayProxyRequest {
            body: Some(BASE64_STANDARD.encode(r#"{"primary_id": 1}"#)),
            is_base64_encoded: true,
            ..Default::default()
        };
        assert_eq!(
            request_body(&encoded).unwrap().as_deref(),
            Some(r#"{"primary_id": 1}"#)
        );

        let missing = ApiGatewayProxyRequest::default();
        assert_eq!(request_body(&missing).unwrap(), None);

        let broken = ApiGatewayProxyRequest {
            body: Some("%%%".to_string()),
            is_base64_encoded: true,
            ..Default::default()
        };
        assert!(request_body(&broken).is_err());
    }

    #[test]
    fn test_respond() {
        let response = respond(StatusCode::BAD_REQUEST, json!({ "error": "nope" }));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.headers[CONTENT_TYPE], "application/json");
        match response.body {
            Some(Body::Text(text)) => assert_eq!(text, r#"{"error":"nope"}"#),
            other => panic!("unexpected body {:?}", other),
        }
    }
}
