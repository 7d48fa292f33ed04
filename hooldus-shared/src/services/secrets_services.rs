use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use crate::models::errors::ConfigError;
use crate::models::notifications::ServiceAccountCredential;
use crate::utilities::config::CredentialSource;

pub async fn get_secrets_client() -> SecretsManagerClient {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    SecretsManagerClient::new(&config)
}

/// Loads and validates the Firebase service account from whichever source is configured.
/// `project_id_override` replaces the key file's project when set.
pub async fn load_service_account(
    source: &CredentialSource,
    project_id_override: Option<&str>,
) -> Result<ServiceAccountCredential, ConfigError> {
    let raw = match source {
        CredentialSource::Secret(secret_id) => {
            let client = get_secrets_client().await;
            fetch_secret_string(&client, secret_id).await?
        }
        other => read_local_source(other)?,
    };

    parse_service_account(&raw, project_id_override)
}

pub fn parse_service_account(
    raw: &str,
    project_id_override: Option<&str>,
) -> Result<ServiceAccountCredential, ConfigError> {
    let credential = ServiceAccountCredential::from_json(raw)?;
    match project_id_override {
        Some(project_id) if !project_id.trim().is_empty() => {
            let credential = credential.with_project_id(project_id.trim());
            credential.validate()?;
            Ok(credential)
        }
        _ => Ok(credential),
    }
}

fn read_local_source(source: &CredentialSource) -> Result<String, ConfigError> {
    match source {
        CredentialSource::Inline(json) => Ok(json.clone()),
        CredentialSource::File(path) => std::fs::read_to_string(path).map_err(|e| ConfigError::KeyFile {
            path: path.clone(),
            reason: e.to_string(),
        }),
        CredentialSource::Secret(secret_id) => Err(ConfigError::SecretFetch(format!(
            "secret {} cannot be read without a Secrets Manager client",
            secret_id
        ))),
    }
}

pub async fn fetch_secret_string(
    client: &SecretsManagerClient,
    secret_id: &str,
) -> Result<String, ConfigError> {
    let output = client
        .get_secret_value()
        .secret_id(secret_id)
        .send()
        .await
        .map_err(|err| {
            if let SdkError::ServiceError(inner) = &err {
                let real_error = inner.err();
                log::error!(
                    "Service error when fetching secret {}: code={:?} message={:?}",
                    secret_id,
                    real_error.code(),
                    real_error.message()
                );
            }
            ConfigError::SecretFetch(format!("{}: {}", secret_id, DisplayErrorContext(&err)))
        })?;

    output
        .secret_string()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::SecretFetch(format!("{} has no string value", secret_id)))
}
