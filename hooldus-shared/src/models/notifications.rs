use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::device_token::Platform;
use crate::models::errors::ConfigError;
use crate::models::ticket::{NotificationType, Ticket};
use crate::utilities::fields::fcm;

/// Inbound request, as posted by the ticket UI when a ticket changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub ticket_id: String,
    pub notification_type: NotificationType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub attempted: usize,
    pub success: usize,
    pub failure: usize,
    pub invalid_tokens: Vec<String>,
    #[serde(default)]
    pub pruned: usize,
    #[serde(default)]
    pub deadline_exceeded: bool,
}

impl DispatchResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl NotificationContent {
    pub fn for_ticket(ticket: &Ticket, notification_type: NotificationType) -> Self {
        let label = match notification_type {
            NotificationType::Created => "Uus teade",
            NotificationType::Updated => "Teadet uuendati",
            NotificationType::Assigned => "Teade on määratud",
            NotificationType::Resolved => "Teade on lahendatud",
            NotificationType::Verified => "Lahendus on kinnitatud",
            NotificationType::Closed => "Teade on suletud",
        };

        let title = if ticket.is_safety_related {
            format!("⚠️ {}: {}", label, ticket.category_name)
        } else {
            format!("{}: {}", label, ticket.category_name)
        };

        let parts: Vec<&str> = [ticket.problem_type_name.as_str(), ticket.location.as_str()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect();
        let body = if parts.is_empty() {
            format!("Teade #{}", ticket.id)
        } else {
            parts.join(", ")
        };

        let data = BTreeMap::from([
            (fcm::DATA_TICKET_ID.to_string(), ticket.id.clone()),
            (fcm::DATA_TYPE.to_string(), notification_type.as_str().to_string()),
            (fcm::DATA_CATEGORY.to_string(), ticket.category_name.clone()),
            (fcm::DATA_PROBLEM_TYPE.to_string(), ticket.problem_type_name.clone()),
            (fcm::DATA_LOCATION.to_string(), ticket.location.clone()),
            (fcm::DATA_STATUS.to_string(), ticket.status.clone()),
        ]);

        Self { title, body, data }
    }
}

fn default_token_uri() -> String {
    fcm::DEFAULT_TOKEN_URI.to_string()
}

/// Google service-account key, as downloaded from the Firebase console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredential {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

impl ServiceAccountCredential {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut credential: ServiceAccountCredential = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidCredential(format!("Invalid service account JSON: {}", e)))?;
        credential.private_key = credential.private_key.replace("\\n", "\n");
        credential.validate()?;
        Ok(credential)
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = [
            ("client_email", self.client_email.trim()),
            ("private_key", self.private_key.trim()),
            ("project_id", self.project_id.trim()),
            ("token_uri", self.token_uri.trim()),
        ]
            .into_iter()
            .find(|(_, value)| value.is_empty());

        if let Some((field, _)) = missing {
            return Err(ConfigError::InvalidCredential(format!("{} is empty", field)));
        }

        if !self.private_key.contains("PRIVATE KEY-----") {
            return Err(ConfigError::InvalidCredential("private_key is not PEM encoded".to_string()));
        }

        Ok(())
    }

    /// Identity used to key cached access tokens.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.client_email, self.token_uri)
    }
}

impl fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .field("private_key_id", &self.private_key_id)
            .finish()
    }
}

#[derive(Serialize, Debug)]
pub struct FirebaseClaims<'a> {
    pub iss: &'a str,
    pub scope: &'a str,
    pub aud: &'a str,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct FcmMessage<'a> {
    pub message: FcmMessageContent<'a>,
}

#[derive(Debug, Serialize)]
pub struct FcmMessageContent<'a> {
    pub token: &'a str,
    pub notification: FcmNotification<'a>,
    pub data: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebpushConfig>,
}

#[derive(Debug, Serialize)]
pub struct FcmNotification<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AndroidConfig {
    pub priority: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApnsConfig {
    pub headers: ApnsHeaders,
    pub payload: ApnsPayload,
}

#[derive(Debug, Serialize)]
pub struct ApnsHeaders {
    #[serde(rename = "apns-priority")]
    pub apns_priority: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Serialize)]
pub struct Aps {
    pub sound: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WebpushConfig {
    pub headers: WebpushHeaders,
}

#[derive(Debug, Serialize)]
pub struct WebpushHeaders {
    #[serde(rename = "Urgency")]
    pub urgency: &'static str,
}

impl<'a> FcmMessage<'a> {
    pub fn for_device(token: &'a str, platform: Platform, content: &'a NotificationContent) -> Self {
        let mut message = FcmMessageContent {
            token,
            notification: FcmNotification {
                title: &content.title,
                body: &content.body,
            },
            data: &content.data,
            android: None,
            apns: None,
            webpush: None,
        };

        match platform {
            Platform::Android => message.android = Some(AndroidConfig { priority: "high" }),
            Platform::Ios => {
                message.apns = Some(ApnsConfig {
                    headers: ApnsHeaders { apns_priority: "10" },
                    payload: ApnsPayload { aps: Aps { sound: "default" } },
                })
            }
            Platform::Web => {
                message.webpush = Some(WebpushConfig {
                    headers: WebpushHeaders { urgency: "high" },
                })
            }
        }

        Self { message }
    }
}

/// Error envelope returned by the FCM v1 API.
#[derive(Debug, Deserialize)]
pub struct FcmErrorEnvelope {
    pub error: FcmErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct FcmErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct FcmErrorDetail {
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::test::{test_credential_json, TEST_PRIVATE_KEY_PEM};
    use serde_json::json;

    fn ticket() -> Ticket {
        Ticket {
            id: "42".into(),
            category_name: "Tehnika ja seadmed".into(),
            problem_type_name: "Projektor".into(),
            location: "Ruum 204".into(),
            is_safety_related: false,
            status: "open".into(),
        }
    }

    #[test]
    fn test_content_for_ticket() {
        let content = NotificationContent::for_ticket(&ticket(), NotificationType::Created);
        assert_eq!(content.title, "Uus teade: Tehnika ja seadmed");
        assert_eq!(content.body, "Projektor, Ruum 204");
        assert_eq!(content.data.get("ticketId").map(String::as_str), Some("42"));
        assert_eq!(content.data.get("type").map(String::as_str), Some("created"));
    }

    #[test]
    fn test_content_falls_back_to_ticket_number() {
        let mut ticket = ticket();
        ticket.problem_type_name.clear();
        ticket.location = "  ".into();
        ticket.is_safety_related = true;

        let content = NotificationContent::for_ticket(&ticket, NotificationType::Closed);
        assert!(content.title.starts_with("⚠️ Teade on suletud"));
        assert_eq!(content.body, "Teade #42");
    }

    #[test]
    fn test_android_envelope() {
        let content = NotificationContent::for_ticket(&ticket(), NotificationType::Assigned);
        let value = serde_json::to_value(FcmMessage::for_device("tok-a", Platform::Android, &content)).unwrap();

        assert_eq!(value["message"]["token"], "tok-a");
        assert_eq!(value["message"]["android"]["priority"], "high");
        assert_eq!(value["message"]["data"]["type"], "assigned");
        assert!(value["message"].get("apns").is_none());
    }

    #[test]
    fn test_ios_envelope() {
        let content = NotificationContent::for_ticket(&ticket(), NotificationType::Resolved);
        let value = serde_json::to_value(FcmMessage::for_device("tok-i", Platform::Ios, &content)).unwrap();

        assert_eq!(value["message"]["apns"]["headers"]["apns-priority"], "10");
        assert_eq!(value["message"]["apns"]["payload"]["aps"]["sound"], "default");
        assert!(value["message"].get("android").is_none());
    }

    #[test]
    fn test_web_envelope() {
        let content = NotificationContent::for_ticket(&ticket(), NotificationType::Updated);
        let value = serde_json::to_value(FcmMessage::for_device("tok-w", Platform::Web, &content)).unwrap();
        assert_eq!(value["message"]["webpush"]["headers"]["Urgency"], "high");
    }

    #[test]
    fn test_credential_from_json_normalises_escaped_newlines() {
        let escaped = TEST_PRIVATE_KEY_PEM.replace('\n', "\\n");
        let raw = json!({
            "type": "service_account",
            "project_id": "hooldus-test",
            "private_key": escaped,
            "client_email": "push@hooldus-test.iam.gserviceaccount.com",
        })
            .to_string();

        let credential = ServiceAccountCredential::from_json(&raw).unwrap();
        assert_eq!(credential.private_key, TEST_PRIVATE_KEY_PEM);
        assert_eq!(credential.token_uri, fcm::DEFAULT_TOKEN_URI);
        assert!(!format!("{:?}", credential).contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_credential_rejects_missing_fields() {
        let raw = test_credential_json("https://oauth2.example.test/token")
            .replace("push@hooldus-test.iam.gserviceaccount.com", "");
        assert!(matches!(
            ServiceAccountCredential::from_json(&raw),
            Err(ConfigError::InvalidCredential(_))
        ));

        assert!(ServiceAccountCredential::from_json("{\"project_id\": \"x\"}").is_err());
    }

    #[test]
    fn test_dispatch_request_uses_camel_case() {
        let request: DispatchRequest =
            serde_json::from_value(json!({"ticketId": "42", "notificationType": "created"})).unwrap();
        assert_eq!(request.ticket_id, "42");
        assert_eq!(request.notification_type, NotificationType::Created);

        let result = serde_json::to_value(DispatchResult {
            attempted: 3,
            success: 2,
            failure: 1,
            invalid_tokens: vec!["tok-c".into()],
            pruned: 1,
            deadline_exceeded: false,
        })
            .unwrap();
        assert_eq!(result["invalidTokens"][0], "tok-c");
        assert_eq!(result["deadlineExceeded"], false);
    }
}
