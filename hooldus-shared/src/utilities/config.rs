use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use crate::models::errors::ConfigError;
use crate::utilities::fields::fcm;

/// Initialize dotenv (only needs to be called once at startup)
pub fn init() {
    if dotenv().is_ok() {
        log::info!("Loaded .env file");
    } else {
        log::debug!("No .env file loaded");
    }
}

pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string())
}

/// Where the Firebase service-account key comes from. First configured source wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Inline(String),
    File(String),
    Secret(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    pub ticket_table: String,
    pub role_table: String,
    pub role_index: String,
    pub device_table: String,
    pub device_token_index: String,
    pub credential_source: CredentialSource,
    pub project_id_override: Option<String>,
    pub fcm_base_url: String,
    pub max_batch_size: usize,
    pub max_concurrency: usize,
    pub deadline: Duration,
    pub http_timeout: Duration,
    pub cache_access_tokens: bool,
    pub metrics_enabled: bool,
}

impl PushConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnv(key.to_string()));

        let credential_source = if let Some(json) = lookup("FIREBASE_SERVICE_ACCOUNT_JSON") {
            CredentialSource::Inline(json)
        } else if let Some(path) = lookup("FIREBASE_SERVICE_ACCOUNT_PATH") {
            CredentialSource::File(path)
        } else if let Some(secret_id) = lookup("FIREBASE_SERVICE_ACCOUNT_SECRET_ID") {
            CredentialSource::Secret(secret_id)
        } else {
            return Err(ConfigError::MissingEnv(
                "FIREBASE_SERVICE_ACCOUNT_JSON, FIREBASE_SERVICE_ACCOUNT_PATH or FIREBASE_SERVICE_ACCOUNT_SECRET_ID"
                    .to_string(),
            ));
        };

        Ok(Self {
            ticket_table: required("TICKET_TABLE_NAME")?,
            role_table: required("USER_ROLE_TABLE_NAME")?,
            role_index: lookup("USER_ROLE_INDEX_NAME").unwrap_or_else(|| "RoleIndex".to_string()),
            device_table: required("DEVICE_TOKEN_TABLE_NAME")?,
            device_token_index: lookup("DEVICE_TOKEN_INDEX_NAME").unwrap_or_else(|| "PushTokenIndex".to_string()),
            credential_source,
            project_id_override: lookup("FIREBASE_PROJECT_ID"),
            fcm_base_url: lookup("FCM_BASE_URL")
                .unwrap_or_else(|| fcm::DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_batch_size: positive(&lookup, "PUSH_MAX_BATCH_SIZE", 500)?,
            max_concurrency: positive(&lookup, "PUSH_MAX_CONCURRENCY", 10)?,
            deadline: Duration::from_secs(positive(&lookup, "PUSH_DEADLINE_SECS", 50)?),
            http_timeout: Duration::from_secs(positive(&lookup, "PUSH_HTTP_TIMEOUT_SECS", 10)?),
            cache_access_tokens: flag(&lookup, "PUSH_CACHE_ACCESS_TOKENS", false)?,
            metrics_enabled: flag(&lookup, "PUSH_METRICS_ENABLED", true)?,
        })
    }
}

fn positive<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value != T::default() => Ok(value),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        },
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        },
    }
}
