use serde::Serialize;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub environment: String,
    pub project_id: String,
}

pub async fn handle(state: &AppState) -> StatusResponse {
    StatusResponse {
        status: "OK".to_string(),
        environment: state.environment.clone(),
        project_id: state.orchestrator.project_id().to_string(),
    }
}
