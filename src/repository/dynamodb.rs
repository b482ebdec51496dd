use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing::debug;

use crate::repository::{Record, RecordFilter, RecordKind, Repository, RepositoryError};

type Item = HashMap<String, AttributeValue>;

/// Table layout: partition key `kind` (S), sort key `id` (S).
#[derive(Clone)]
pub struct DynamoRepository {
    client: DynamoDbClient,
    table: String,
}

impl DynamoRepository {
    pub fn new(client: DynamoDbClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

fn sdk_error<E: std::error::Error>(e: E) -> RepositoryError {
    RepositoryError::DynamoDb(DisplayErrorContext(e).to_string())
}

fn to_item(record: &Record) -> Item {
    let mut item = HashMap::from([
        ("kind".to_string(), AttributeValue::S(record.kind.to_string())),
        ("id".to_string(), AttributeValue::S(record.id.clone())),
        ("title".to_string(), AttributeValue::S(record.title.clone())),
        (
            "time_created".to_string(),
            AttributeValue::N(record.time_created.to_string()),
        ),
        ("message".to_string(), AttributeValue::S(record.message.clone())),
    ]);
    if let Some(resolved) = record.time_resolved {
        item.insert(
            "time_resolved".to_string(),
            AttributeValue::N(resolved.to_string()),
        );
    }
    item
}

fn string_attr(item: &Item, name: &str) -> Result<String, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::Malformed(format!("missing string attribute {}", name)))
}

fn number_attr(item: &Item, name: &str) -> Result<Option<i64>, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .map(|n| {
            n.parse::<i64>()
                .map_err(|e| RepositoryError::Malformed(format!("{} - {}", name, e)))
        })
        .transpose()
}

fn from_item(item: &Item) -> Result<Record, RepositoryError> {
    Ok(Record {
        kind: string_attr(item, "kind")?.parse()?,
        id: string_attr(item, "id")?,
        title: string_attr(item, "title").unwrap_or_default(),
        time_created: number_attr(item, "time_created")?.ok_or_else(|| {
            RepositoryError::Malformed("missing number attribute time_created".to_string())
        })?,
        time_resolved: number_attr(item, "time_resolved")?,
        message: string_attr(item, "message").unwrap_or_default(),
    })
}

fn key(kind: RecordKind, id: &str) -> Item {
    HashMap::from([
        ("kind".to_string(), AttributeValue::S(kind.to_string())),
        ("id".to_string(), AttributeValue::S(id.to_string())),
    ])
}

#[async_trait]
impl Repository for DynamoRepository {
    async fn put(&self, record: Record) -> Result<(), RepositoryError> {
        debug!("put {} {} into {}", record.kind, record.id, self.table);
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(&record)))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>, RepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .set_key(Some(key(kind, id)))
            .send()
            .await
            .map_err(sdk_error)?;
        output.item.as_ref().map(from_item).transpose()
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<(), RepositoryError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .set_key(Some(key(kind, id)))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn list(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, RepositoryError> {
        let mut conditions = Vec::new();
        let mut values = HashMap::from([(":kind".to_string(), AttributeValue::S(kind.to_string()))]);
        if let Some(from) = filter.created_from {
            conditions.push("#tc >= :from");
            values.insert(":from".to_string(), AttributeValue::N(from.to_string()));
        }
        if let Some(to) = filter.created_to {
            conditions.push("#tc <= :to");
            values.insert(":to".to_string(), AttributeValue::N(to.to_string()));
        }

        let mut names = HashMap::from([("#k".to_string(), "kind".to_string())]);
        let filter_expression = if conditions.is_empty() {
            None
        } else {
            names.insert("#tc".to_string(), "time_created".to_string());
            Some(conditions.join(" AND "))
        };

        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("#k = :kind")
                .set_filter_expression(filter_expression.clone())
                .set_expression_attribute_names(Some(names.clone()))
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(sdk_error)?;

            for item in output.items.unwrap_or_default() {
                records.push(from_item(&item)?);
            }

            match output.last_evaluated_key {
                Some(last) if !last.is_empty() => start_key = Some(last),
                _ => break,
            }
        }

        records.sort_by_key(|r| r.time_created);
        Ok(records)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
    use aws_smithy_runtime::client::http::test_util::{ReplayEvent, StaticReplayClient};
    use aws_smithy_types::body::SdkBody;

    fn mock_client(responses: Vec<&str>) -> DynamoDbClient {
        let events = responses
            .into_iter()
            .map(|body| {
                ReplayEvent::new(
                    http::Request::builder().body(SdkBody::from("")).unwrap(),
                    http::Response::builder()
                        .status(200)
                        .body(SdkBody::from(body.to_string()))
                        .unwrap(),
                )
            })
            .collect();

        let conf = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(Credentials::new(
                "SOMETESTKEYID",
                "somesecretkey",
                Some("somesessiontoken".to_string()),
                None,
                "",
            ))
            .region(Region::new("eu-central-1"))
            .http_client(StaticReplayClient::new(events))
            .build();
        DynamoDbClient::from_conf(conf)
    }

    #[test]
    fn test_item_conversion() {
        let record = Record {
            kind: RecordKind::Incident,
            id: "1234".to_string(),
            title: "checkout down".to_string(),
            time_created: 1672531200,
            time_resolved: Some(1672617600),
            message: "{}".to_string(),
        };
        let item = to_item(&record);
        assert_eq!(item["kind"], AttributeValue::S("incident".to_string()));
        assert_eq!(item["time_created"], AttributeValue::N("1672531200".to_string()));
        assert_eq!(from_item(&item).unwrap(), record);

        let mut open = record.clone();
        open.time_resolved = None;
        assert!(!to_item(&open).contains_key("time_resolved"));
    }

    #[test]
    fn test_from_item_rejects_missing_key() {
        let mut item = to_item(&Record {
            kind: RecordKind::Change,
            id: "1".to_string(),
            title: String::new(),
            time_created: 1,
            time_resolved: None,
            message: String::new(),
        });
        item.remove("time_created");
        assert!(matches!(from_item(&item), Err(RepositoryError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_get_item() {
        let client = mock_client(vec![
            r#"{"Item": {
                "kind": {"S": "incident"},
                "id": {"S": "7"},
                "title": {"S": "queue backlog"},
                "time_created": {"N": "100"},
                "message": {"S": "{}"}
            }}"#,
        ]);
        let repo = DynamoRepository::new(client, "dora-events");
        let record = repo.get(RecordKind::Incident, "7").await.unwrap().unwrap();
        assert_eq!(record.title, "queue backlog");
        assert_eq!(record.time_created, 100);
        assert_eq!(record.time_resolved, None);
    }

    #[tokio::test]
    async fn test_get_missing_item() {
        let repo = DynamoRepository::new(mock_client(vec!["{}"]), "dora-events");
        assert!(repo.get(RecordKind::Incident, "7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let client = mock_client(vec![
            r#"{"Items": [{
                "kind": {"S": "deployment"}, "id": {"S": "b"},
                "time_created": {"N": "200"}
            }], "Count": 1, "LastEvaluatedKey": {"kind": {"S": "deployment"}, "id": {"S": "b"}}}"#,
            r#"{"Items": [{
                "kind": {"S": "deployment"}, "id": {"S": "a"},
                "time_created": {"N": "100"}
            }], "Count": 1}"#,
        ]);
        let repo = DynamoRepository::new(client, "dora-events");
        let records = repo
            .list(RecordKind::Deployment, &RecordFilter::default())
            .await
            .unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
