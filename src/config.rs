use std::env;
use std::fmt;
use std::str::FromStr;
use std::string::String;

use aws_config::SdkConfig;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;

pub const DEFAULT_SHORTCUT_API_URL: &str = "https://api.app.shortcut.com/api/v3";
pub const MAX_TIMEZONE_OFFSET: i64 = 24;

#[derive(Clone)]
pub struct Config {
    pub shortcut_token: String,
    pub incident_label_id: i64,
    pub shortcut_api_url: String,
    pub request_timeout: u64,
    // hours; applied sign-flipped, see dates::date_to_unix
    pub timezone_offset: i64,
    pub repository_type: RepositoryType,
    pub events_table: Option<String>,
}

// the token never shows up in logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("shortcut_token", &"***")
            .field("incident_label_id", &self.incident_label_id)
            .field("shortcut_api_url", &self.shortcut_api_url)
            .field("request_timeout", &self.request_timeout)
            .field("timezone_offset", &self.timezone_offset)
            .field("repository_type", &self.repository_type)
            .field("events_table", &self.events_table)
            .finish()
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum RepositoryType {
    Local,
    DynamoDb,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "local" | "memory" => Ok(RepositoryType::Local),
            "dynamodb" => Ok(RepositoryType::DynamoDb),
            other => Err(format!("Invalid or Unsupported repository type {}", other)),
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RepositoryType::Local => write!(f, "local"),
            RepositoryType::DynamoDb => write!(f, "dynamodb"),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("error parsing {name} - {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env::var(name)
        .unwrap_or(default.to_string())
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })
}

impl Config {
    pub fn load_from_env() -> Result<Config, ConfigError> {
        let shortcut_token = required("SHORTCUT_TOKEN")?;
        let incident_label_id = required("SHORTCUT_INCIDENT_LABEL_ID")?
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid {
                name: "SHORTCUT_INCIDENT_LABEL_ID",
                reason: e.to_string(),
            })?;

        let repository_type = env::var("REPOSITORY_TYPE")
            .unwrap_or("local".to_string())
            .parse::<RepositoryType>()
            .map_err(|reason| ConfigError::Invalid {
                name: "REPOSITORY_TYPE",
                reason,
            })?;

        let events_table = env::var("EVENTS_TABLE")
            .ok()
            .filter(|s| !s.trim().is_empty());
        if repository_type == RepositoryType::DynamoDb && events_table.is_none() {
            return Err(ConfigError::Missing("EVENTS_TABLE"));
        }

        let timezone_offset: i64 = parsed("TIMEZONE_OFFSET", "0")?;
        if !(-MAX_TIMEZONE_OFFSET..=MAX_TIMEZONE_OFFSET).contains(&timezone_offset) {
            return Err(ConfigError::Invalid {
                name: "TIMEZONE_OFFSET",
                reason: format!(
                    "{} is outside -{max}..={max} hours",
                    timezone_offset,
                    max = MAX_TIMEZONE_OFFSET
                ),
            });
        }

        let conf = Config {
            shortcut_token,
            incident_label_id,
            shortcut_api_url: env::var("SHORTCUT_API_URL")
                .unwrap_or(DEFAULT_SHORTCUT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: parsed("SHORTCUT_REQUEST_TIMEOUT", "30")?,
            timezone_offset,
            repository_type,
            events_table,
        };

        Ok(conf)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum KeySourceError {
    #[error("Failed to access AWS Secrets Manager. Please make sure the lambda function has permissions to access the {secret_id} secret. Error: {error:?}")]
    FailedToAccessSecretsManager {
        secret_id: String,
        error: GetSecretValueError,
    },
    #[error("Didn't find the {secret_id} secret in AWS secretsmanager")]
    MissingSecret { secret_id: String },
}

pub fn is_secret_arn(value: &str) -> bool {
    value.starts_with("arn:aws:secretsmanager:")
}

pub async fn get_token_from_secrets_manager(
    aws_config: &SdkConfig,
    secret_id: String,
) -> Result<String, KeySourceError> {
    let secretsmanager = aws_sdk_secretsmanager::Client::new(aws_config);
    let response = secretsmanager
        .get_secret_value()
        .set_secret_id(Some(secret_id.clone()))
        .send()
        .await
        .map_err(|error| KeySourceError::FailedToAccessSecretsManager {
            secret_id: secret_id.clone(),
            error: error.into_service_error(),
        })?;
    let secret = response
        .secret_string
        .ok_or(KeySourceError::MissingSecret { secret_id })?;
    Ok(secret.trim().to_string())
}
