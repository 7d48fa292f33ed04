// src/models/ticket.rs

use std::collections::HashMap;
use std::fmt;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use crate::database::errors::StoreError;
use crate::utilities::fields::dynamodb;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub category_name: String,
    pub problem_type_name: String,
    pub location: String,
    pub is_safety_related: bool,
    pub status: String,
}

impl Ticket {
    pub fn from_item(item: &HashMap<String, AttributeValue>) -> Result<Self, StoreError> {
        let text = |name: &'static str| -> Result<String, StoreError> {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .ok_or(StoreError::MissingAttribute(name))
        };

        // Older rows were written before the safety flag existed.
        let is_safety_related = item.get(dynamodb::SAFETY_FIELD)
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false);

        Ok(Ticket {
            id: text(dynamodb::TICKET_ID_FIELD)?,
            category_name: text(dynamodb::CATEGORY_FIELD)?,
            problem_type_name: text(dynamodb::PROBLEM_TYPE_FIELD).unwrap_or_default(),
            location: text(dynamodb::LOCATION_FIELD).unwrap_or_default(),
            is_safety_related,
            status: text(dynamodb::STATUS_FIELD).unwrap_or_else(|_| "open".to_string()),
        })
    }
}

/// Ticket lifecycle event that triggered a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Created,
    Updated,
    Assigned,
    Resolved,
    Verified,
    Closed,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Created => "created",
            NotificationType::Updated => "updated",
            NotificationType::Assigned => "assigned",
            NotificationType::Resolved => "resolved",
            NotificationType::Verified => "verified",
            NotificationType::Closed => "closed",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
