// src/models/device_token.rs

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::database::errors::StoreError;
use crate::utilities::fields::dynamodb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "web" => Ok(Platform::Web),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// A push registration for one installed app instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub token: String,
    pub platform: Platform,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceToken {
    pub fn new(token: impl Into<String>, platform: Platform, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            platform,
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_item(item: &HashMap<String, AttributeValue>) -> Result<Self, StoreError> {
        let token = item.get(dynamodb::PUSH_TOKEN_FIELD)
            .and_then(|v| v.as_s().ok())
            .ok_or(StoreError::MissingAttribute(dynamodb::PUSH_TOKEN_FIELD))?
            .to_string();

        let user_id = item.get(dynamodb::USER_ID_FIELD)
            .and_then(|v| v.as_s().ok())
            .ok_or(StoreError::MissingAttribute(dynamodb::USER_ID_FIELD))?
            .to_string();

        let platform = match item.get(dynamodb::PLATFORM_FIELD).and_then(|v| v.as_s().ok()) {
            Some(raw) => raw.parse::<Platform>().map_err(|_| StoreError::InvalidAttribute {
                attribute: dynamodb::PLATFORM_FIELD,
                value: raw.to_string(),
            })?,
            None => Platform::default(),
        };

        let timestamp = |name: &str| {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };
        let created_at = timestamp(dynamodb::CREATED_AT_FIELD).unwrap_or_else(Utc::now);
        let updated_at = timestamp(dynamodb::UPDATED_AT_FIELD).unwrap_or(created_at);

        Ok(DeviceToken {
            token,
            platform,
            user_id,
            created_at,
            updated_at,
        })
    }
}
