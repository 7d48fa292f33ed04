use std::collections::BTreeSet;
use std::fmt;
use futures::stream::{self, StreamExt};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, info, warn};
use crate::models::device_token::DeviceToken;
use crate::models::notifications::{
    AccessToken, DispatchResult, FcmErrorEnvelope, FcmMessage, NotificationContent,
};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(50);

/// Why the provider refused a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The registration is gone for good and should be deleted.
    Permanent { status: u16, code: String, message: String },
    Transient { status: u16, code: String, message: String },
    /// The error body could not be decoded.
    Unknown { status: u16, body: String },
}

impl ProviderError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, ProviderError::Permanent { .. })
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Permanent { status, code, message } =>
                write!(f, "permanent {} {}: {}", status, code, message),
            ProviderError::Transient { status, code, message } =>
                write!(f, "transient {} {}: {}", status, code, message),
            ProviderError::Unknown { status, body } => write!(f, "unknown {}: {}", status, body),
        }
    }
}

const PERMANENT_CODES: [&str; 3] = ["UNREGISTERED", "NotRegistered", "InvalidRegistration"];

/// Maps a non-2xx FCM response onto [`ProviderError`].
pub fn classify_provider_error(status: u16, body: &str) -> ProviderError {
    let Ok(envelope) = serde_json::from_str::<FcmErrorEnvelope>(body) else {
        return ProviderError::Unknown { status, body: truncate(body, 512) };
    };

    let error = envelope.error;
    let message = error.message.unwrap_or_default();
    let code = error
        .details
        .iter()
        .find_map(|detail| detail.error_code.clone())
        .or(error.status);

    let Some(code) = code else {
        return ProviderError::Unknown { status, body: truncate(body, 512) };
    };

    let invalid_registration = code == "INVALID_ARGUMENT"
        && message.to_ascii_lowercase().contains("registration token");

    if PERMANENT_CODES.contains(&code.as_str()) || invalid_registration {
        ProviderError::Permanent { status, code, message }
    } else {
        ProviderError::Transient { status, code, message }
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

/// Outcome of one device send.
#[derive(Debug, Clone)]
pub struct TokenOutcome {
    pub token: String,
    pub result: Result<(), ProviderError>,
}

/// Sends one FCM message per device token with bounded concurrency.
pub struct MessageDispatcher {
    http: reqwest::Client,
    send_url: String,
    max_batch_size: usize,
    concurrency: usize,
}

impl MessageDispatcher {
    pub fn new(http: reqwest::Client, base_url: &str, project_id: &str) -> Self {
        Self {
            http,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                base_url.trim_end_matches('/'),
                project_id
            ),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn send(
        &self,
        bearer: &AccessToken,
        tokens: &[DeviceToken],
        content: &NotificationContent,
    ) -> DispatchResult {
        self.send_until(bearer, tokens, content, Instant::now() + DEFAULT_DEADLINE).await
    }

    /// Sends to every token, stopping early once `deadline` passes.
    ///
    /// Tokens that never got an answer before the deadline are counted as
    /// failures, so `success + failure == tokens.len()` always holds.
    pub async fn send_until(
        &self,
        bearer: &AccessToken,
        tokens: &[DeviceToken],
        content: &NotificationContent,
        deadline: Instant,
    ) -> DispatchResult {
        let mut result = DispatchResult {
            attempted: tokens.len(),
            ..DispatchResult::default()
        };
        let mut invalid = BTreeSet::new();
        let mut settled = 0usize;

        'chunks: for (index, chunk) in tokens.chunks(self.max_batch_size).enumerate() {
            debug!(chunk = index, size = chunk.len(), "Sending chunk");

            let deliveries: Vec<_> = chunk
                .iter()
                .map(|device| self.deliver(bearer, device, content))
                .collect();
            let mut pending = stream::iter(deliveries).buffer_unordered(self.concurrency);

            loop {
                match timeout_at(deadline, pending.next()).await {
                    Ok(Some(outcome)) => {
                        settled += 1;
                        match outcome.result {
                            Ok(()) => result.success += 1,
                            Err(ProviderError::Permanent { .. }) => {
                                invalid.insert(outcome.token);
                            }
                            Err(_) => {}
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        result.deadline_exceeded = true;
                        break 'chunks;
                    }
                }
            }
        }

        if result.deadline_exceeded {
            warn!(
                settled,
                unsent = tokens.len() - settled,
                "Dispatch deadline exceeded, remaining sends abandoned"
            );
        }

        result.failure = tokens.len() - result.success;
        result.invalid_tokens = invalid.into_iter().collect();

        info!(
            attempted = result.attempted,
            success = result.success,
            failure = result.failure,
            invalid = result.invalid_tokens.len(),
            "Push send complete"
        );
        result
    }

    async fn deliver(
        &self,
        bearer: &AccessToken,
        device: &DeviceToken,
        content: &NotificationContent,
    ) -> TokenOutcome {
        let message = FcmMessage::for_device(&device.token, device.platform, content);

        let response = match self
            .http
            .post(&self.send_url)
            .bearer_auth(&bearer.token)
            .json(&message)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(user_id = %device.user_id, error = %e, "Push request failed to complete");
                return TokenOutcome {
                    token: device.token.clone(),
                    result: Err(ProviderError::Transient {
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        code: "TRANSPORT".to_string(),
                        message: e.to_string(),
                    }),
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return TokenOutcome { token: device.token.clone(), result: Ok(()) };
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_provider_error(status.as_u16(), &body);
        if error.is_permanent() {
            info!(user_id = %device.user_id, platform = %device.platform, %error, "Device token permanently invalid");
        } else {
            warn!(user_id = %device.user_id, platform = %device.platform, %error, "Push failed");
        }

        TokenOutcome { token: device.token.clone(), result: Err(error) }
    }
}
