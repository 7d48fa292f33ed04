use hooldus_shared::models::errors::ConfigError;
use hooldus_shared::services::dispatch_orchestrator::DispatchOrchestrator;
use hooldus_shared::utilities::config::{get_environment, PushConfig};

/// Built once per Lambda container and shared by every invocation.
pub struct AppState {
    pub orchestrator: DispatchOrchestrator,
    pub environment: String,
}

impl AppState {
    pub fn new(orchestrator: DispatchOrchestrator) -> Self {
        Self { orchestrator, environment: get_environment() }
    }

    pub async fn from_config(config: &PushConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(DispatchOrchestrator::from_config(config).await?))
    }
}
