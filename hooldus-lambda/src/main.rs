use std::sync::Arc;
use lambda_http::{service_fn, Error, Request};
use tracing_subscriber::EnvFilter;
use crate::router::handle_lambda;
use crate::state::AppState;
use hooldus_shared::utilities::config::{self, PushConfig};

mod endpoints;
mod router;
mod state;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    std::panic::set_hook(Box::new(|info| {
        log::error!("Application panicked: {}", info);
    }));

    config::init();
    let push_config = PushConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&push_config).await?);
    tracing::info!(project_id = %state.orchestrator.project_id(), "Hooldus push dispatcher ready");

    lambda_http::run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { handle_lambda(&state, event).await }
    }))
        .await?;
    Ok(())
}
