use std::fmt;
use serde::Serialize;
use thiserror::Error;
use reqwest::Error as ReqwestError;
use crate::database::errors::StoreError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid service account: {0}")]
    InvalidCredential(String),

    #[error("Unable to read key file at {path}: {reason}")]
    KeyFile { path: String, reason: String },

    #[error("Secrets Manager error: {0}")]
    SecretFetch(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Private key could not be parsed: {0}")]
    InvalidKey(String),

    #[error("Failed to sign JWT assertion: {0}")]
    Signing(String),

    #[error("Token endpoint request failed: {0}")]
    Transport(#[from] ReqwestError),

    #[error("Token endpoint rejected assertion with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Position of a dispatch in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    LoadingTicket,
    ResolvingAudience,
    Authenticating,
    Sending,
    Pruning,
    Done,
    Failed,
}

impl DispatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStage::LoadingTicket => "loading_ticket",
            DispatchStage::ResolvingAudience => "resolving_audience",
            DispatchStage::Authenticating => "authenticating",
            DispatchStage::Sending => "sending",
            DispatchStage::Pruning => "pruning",
            DispatchStage::Done => "done",
            DispatchStage::Failed => "failed",
        }
    }
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a whole dispatch. Per-device failures never surface here.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Push provider authentication failed: {0}")]
    Auth(AuthError),

    #[error("Ticket {0} not found")]
    NotFound(String),

    #[error("Data store error while {stage}: {source}")]
    Store {
        stage: DispatchStage,
        #[source]
        source: StoreError,
    },
}

impl DispatchError {
    pub fn stage(&self) -> DispatchStage {
        match self {
            DispatchError::Configuration(_) | DispatchError::Auth(_) => DispatchStage::Authenticating,
            DispatchError::NotFound(_) => DispatchStage::LoadingTicket,
            DispatchError::Store { stage, .. } => *stage,
        }
    }

    pub fn store(stage: DispatchStage) -> impl FnOnce(StoreError) -> DispatchError {
        move |source| DispatchError::Store { stage, source }
    }
}

impl From<AuthError> for DispatchError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidKey(msg) => DispatchError::Configuration(msg),
            other => DispatchError::Auth(other),
        }
    }
}

impl From<ConfigError> for DispatchError {
    fn from(err: ConfigError) -> Self {
        DispatchError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_maps_to_configuration_error() {
        let err: DispatchError = AuthError::InvalidKey("not a PEM".into()).into();
        assert!(matches!(err, DispatchError::Configuration(_)));
        assert_eq!(err.stage(), DispatchStage::Authenticating);
    }

    #[test]
    fn test_rejected_assertion_maps_to_auth_error() {
        let err: DispatchError = AuthError::Rejected { status: 401, body: "invalid_grant".into() }.into();
        assert!(matches!(err, DispatchError::Auth(AuthError::Rejected { status: 401, .. })));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_store_error_keeps_stage() {
        let err = DispatchError::store(DispatchStage::ResolvingAudience)(StoreError::MissingAttribute("Role"));
        assert_eq!(err.stage(), DispatchStage::ResolvingAudience);
        assert!(err.to_string().contains("resolving_audience"));
    }
}
