use http::Response;
use lambda_http::{Body, Request};
use hooldus_shared::models::notifications::DispatchRequest;
use hooldus_shared::utilities::requests::parse_body;
use hooldus_shared::utilities::responses::{dispatch_error_response, error_response, success_response};
use crate::state::AppState;

pub async fn handler(state: &AppState, event: Request) -> Result<Response<Body>, lambda_http::Error> {
    let request: DispatchRequest = match parse_body(&event) {
        Ok(request) => request,
        Err(err) => {
            log::info!("Request is invalid: {}", err);
            return error_response(err);
        }
    };

    if request.ticket_id.trim().is_empty() {
        return error_response("ticketId must not be empty");
    }

    log::info!("Request is valid: {:?}", &request);

    match state.orchestrator.dispatch(&request).await {
        Ok(result) => success_response(result),
        Err(err) => dispatch_error_response(&err),
    }
}
