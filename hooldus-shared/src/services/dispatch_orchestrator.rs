use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;
use crate::database::client::get_dynamodb_client;
use crate::models::errors::{ConfigError, DispatchError, DispatchStage};
use crate::models::notifications::{
    DispatchRequest, DispatchResult, NotificationContent, ServiceAccountCredential,
};
use crate::repositories::device_repository::{DeviceRepository, DynamoDeviceRepository};
use crate::repositories::role_repository::{DynamoRoleRepository, RoleRepository};
use crate::repositories::ticket_repository::{DynamoTicketRepository, TicketRepository};
use crate::services::cloudwatch_services::OperationMetricTracker;
use crate::services::credential_minter::CredentialMinter;
use crate::services::message_dispatcher::{
    MessageDispatcher, DEFAULT_CONCURRENCY, DEFAULT_DEADLINE, DEFAULT_MAX_BATCH_SIZE,
};
use crate::services::secrets_services::load_service_account;
use crate::services::target_resolver::TargetResolver;
use crate::services::token_lifecycle::TokenLifecycleManager;
use crate::utilities::config::PushConfig;
use crate::utilities::fields::fcm;

/// Cached tokens are refreshed once they get this close to expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub fcm_base_url: String,
    pub max_batch_size: usize,
    pub max_concurrency: usize,
    pub deadline: Duration,
    pub cache_access_tokens: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            fcm_base_url: fcm::DEFAULT_BASE_URL.to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_CONCURRENCY,
            deadline: DEFAULT_DEADLINE,
            cache_access_tokens: false,
        }
    }
}

impl From<&PushConfig> for DispatchSettings {
    fn from(config: &PushConfig) -> Self {
        Self {
            fcm_base_url: config.fcm_base_url.clone(),
            max_batch_size: config.max_batch_size,
            max_concurrency: config.max_concurrency,
            deadline: config.deadline,
            cache_access_tokens: config.cache_access_tokens,
        }
    }
}

/// Runs one notification from ticket id to pruned token store.
///
/// Stages run strictly in order: load ticket, resolve audience, authenticate,
/// send, prune. Loading, resolving and authenticating can fail the whole
/// dispatch. Sending and pruning never do; their failures end up counted in
/// the [`DispatchResult`].
pub struct DispatchOrchestrator {
    tickets: Arc<dyn TicketRepository>,
    resolver: TargetResolver,
    lifecycle: TokenLifecycleManager,
    minter: CredentialMinter,
    dispatcher: MessageDispatcher,
    credential: Arc<ServiceAccountCredential>,
    deadline: Duration,
    metrics: OperationMetricTracker,
}

impl DispatchOrchestrator {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        roles: Arc<dyn RoleRepository>,
        devices: Arc<dyn DeviceRepository>,
        http: reqwest::Client,
        credential: Arc<ServiceAccountCredential>,
        settings: DispatchSettings,
    ) -> Self {
        let minter = CredentialMinter::new(http.clone());
        let minter = if settings.cache_access_tokens {
            minter.with_cache(chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS))
        } else {
            minter
        };

        let dispatcher = MessageDispatcher::new(http, &settings.fcm_base_url, &credential.project_id)
            .with_max_batch_size(settings.max_batch_size)
            .with_concurrency(settings.max_concurrency);

        Self {
            tickets,
            resolver: TargetResolver::new(roles, devices.clone()),
            lifecycle: TokenLifecycleManager::new(devices),
            minter,
            dispatcher,
            credential,
            deadline: settings.deadline,
            metrics: OperationMetricTracker::disabled("Dispatch"),
        }
    }

    pub fn with_metrics(mut self, metrics: OperationMetricTracker) -> Self {
        self.metrics = metrics;
        self
    }

    /// Wires the DynamoDB stores, credential and HTTP client described by `config`.
    pub async fn from_config(config: &PushConfig) -> Result<Self, ConfigError> {
        let credential = load_service_account(
            &config.credential_source,
            config.project_id_override.as_deref(),
        )
            .await?;

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "PUSH_HTTP_TIMEOUT_SECS".to_string(),
                value: e.to_string(),
            })?;

        let db = get_dynamodb_client().await;
        let tickets = Arc::new(DynamoTicketRepository::new(db.clone(), config.ticket_table.clone()));
        let roles = Arc::new(DynamoRoleRepository::new(
            db.clone(),
            config.role_table.clone(),
            config.role_index.clone(),
        ));
        let devices = Arc::new(DynamoDeviceRepository::new(
            db,
            config.device_table.clone(),
            config.device_token_index.clone(),
        ));

        let metrics = if config.metrics_enabled {
            OperationMetricTracker::build("Dispatch").await
        } else {
            OperationMetricTracker::disabled("Dispatch")
        };

        info!(
            project_id = %credential.project_id,
            cache_access_tokens = config.cache_access_tokens,
            metrics = config.metrics_enabled,
            "Dispatch orchestrator configured"
        );

        Ok(Self::new(tickets, roles, devices, http, Arc::new(credential), DispatchSettings::from(config))
            .with_metrics(metrics))
    }

    pub fn project_id(&self) -> &str {
        &self.credential.project_id
    }

    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError> {
        let span = info_span!(
            "dispatch",
            dispatch_id = %Uuid::new_v4(),
            ticket_id = %request.ticket_id,
            notification_type = %request.notification_type,
        );

        async {
            let metrics = self.metrics.restart();
            let outcome = self.run(request).await;
            metrics.track(&outcome).await;

            match &outcome {
                Ok(result) => metrics.record_dispatch(result).await,
                Err(e) => {
                    if matches!(e, DispatchError::Auth(_)) {
                        metrics.emit_mint_failure().await;
                    }
                    error!(stage = %e.stage(), error = %e, "Dispatch failed");
                    enter(DispatchStage::Failed);
                }
            }
            outcome
        }
            .instrument(span)
            .await
    }

    async fn run(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError> {
        let deadline = Instant::now() + self.deadline;

        enter(DispatchStage::LoadingTicket);
        let ticket = self
            .tickets
            .get_ticket(&request.ticket_id)
            .await
            .map_err(DispatchError::store(DispatchStage::LoadingTicket))?
            .ok_or_else(|| DispatchError::NotFound(request.ticket_id.clone()))?;

        enter(DispatchStage::ResolvingAudience);
        let tokens = self
            .resolver
            .resolve(&ticket)
            .await
            .map_err(DispatchError::store(DispatchStage::ResolvingAudience))?;

        if tokens.is_empty() {
            info!("No device tokens for audience, nothing to send");
            enter(DispatchStage::Done);
            return Ok(DispatchResult::empty());
        }

        enter(DispatchStage::Authenticating);
        let bearer = self.minter.mint(&self.credential).await?;

        enter(DispatchStage::Sending);
        let content = NotificationContent::for_ticket(&ticket, request.notification_type);
        let mut result = self
            .dispatcher
            .send_until(&bearer, &tokens, &content, deadline)
            .await;

        enter(DispatchStage::Pruning);
        if !result.invalid_tokens.is_empty() {
            result.pruned = self.lifecycle.prune(&result.invalid_tokens).await;
        }

        enter(DispatchStage::Done);
        info!(
            attempted = result.attempted,
            success = result.success,
            failure = result.failure,
            pruned = result.pruned,
            deadline_exceeded = result.deadline_exceeded,
            "Dispatch complete"
        );
        Ok(result)
    }
}

fn enter(stage: DispatchStage) {
    info!(%stage, "Dispatch stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{NotificationType, Ticket};
    use crate::repositories::memory::{InMemoryDeviceRepository, InMemoryRoleRepository, InMemoryTicketRepository};
    use crate::utilities::test::test_credential;

    fn orchestrator(tickets: Arc<InMemoryTicketRepository>) -> DispatchOrchestrator {
        DispatchOrchestrator::new(
            tickets,
            Arc::new(InMemoryRoleRepository::new()),
            Arc::new(InMemoryDeviceRepository::new()),
            reqwest::Client::new(),
            Arc::new(test_credential("http://127.0.0.1:9/token")),
            DispatchSettings::default(),
        )
    }

    #[test]
    fn test_settings_follow_config() {
        let config = PushConfig::from_lookup(|key| match key {
            "TICKET_TABLE_NAME" => Some("t".into()),
            "USER_ROLE_TABLE_NAME" => Some("r".into()),
            "DEVICE_TOKEN_TABLE_NAME" => Some("d".into()),
            "FIREBASE_SERVICE_ACCOUNT_JSON" => Some("{}".into()),
            "PUSH_MAX_BATCH_SIZE" => Some("100".into()),
            "PUSH_CACHE_ACCESS_TOKENS" => Some("true".into()),
            _ => None,
        })
            .unwrap();

        let settings = DispatchSettings::from(&config);
        assert_eq!(settings.max_batch_size, 100);
        assert_eq!(settings.max_concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(settings.deadline, Duration::from_secs(50));
        assert!(settings.cache_access_tokens);
    }

    #[tokio::test]
    async fn test_missing_ticket_fails_at_loading_stage() {
        let orchestrator = orchestrator(Arc::new(InMemoryTicketRepository::new()));
        let err = orchestrator
            .dispatch(&DispatchRequest { ticket_id: "404".into(), notification_type: NotificationType::Created })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotFound(ref id) if id == "404"));
        assert_eq!(err.stage(), DispatchStage::LoadingTicket);
    }

    #[tokio::test]
    async fn test_empty_audience_never_authenticates() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        tickets
            .insert(Ticket {
                id: "7".into(),
                category_name: "Küte".into(),
                problem_type_name: "Radiaator".into(),
                location: "Ruum 1".into(),
                is_safety_related: false,
                status: "open".into(),
            })
            .await;

        // The token endpoint points at a closed port, so reaching it would fail.
        let result = orchestrator(tickets)
            .dispatch(&DispatchRequest { ticket_id: "7".into(), notification_type: NotificationType::Updated })
            .await
            .unwrap();

        assert_eq!(result, DispatchResult::empty());
    }
}
