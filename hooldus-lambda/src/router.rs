use lambda_http::{Body, Request, Response};
use lambda_http::RequestExt;
use crate::endpoints::{notify, status};
use crate::state::AppState;
use hooldus_shared::utilities::requests::strip_stage_prefix;
use hooldus_shared::utilities::responses::{not_found_response, success_response};

const GET: &str = "GET";
const POST: &str = "POST";

pub async fn handle_lambda(state: &AppState, event: Request) -> Result<Response<Body>, lambda_http::Error> {
    let raw_path = event.raw_http_path();
    // Requests that did not come through API Gateway carry no raw path.
    let raw_path = if raw_path.is_empty() { event.uri().path().to_string() } else { raw_path.to_string() };
    let path = strip_stage_prefix(&raw_path);

    log::info!("Received request for path: {}", path);

    match (event.method().as_str(), path) {
        //Monitor
        (GET, "/status") => success_response(status::handle(state).await),

        //Dispatch
        (POST, "/notify") => notify::handler(state, event).await,

        //Not found
        _ => not_found_response("Not Found"),
    }
}
