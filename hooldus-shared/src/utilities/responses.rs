use http::StatusCode;
use lambda_http::{Response, Body};
use serde::Serialize;
use crate::models::errors::DispatchError;

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'a str>,
}

pub fn success_response<T: Serialize>(data: T) -> Result<Response<Body>, lambda_http::Error> {
    response_with_code(data, StatusCode::OK)
}

pub fn error_response(message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    response_with_code(ErrorBody { error: message.into(), stage: None }, StatusCode::BAD_REQUEST)
}

pub fn not_found_response(message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    response_with_code(ErrorBody { error: message.into(), stage: None }, StatusCode::NOT_FOUND)
}

pub fn dispatch_error_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::Auth(_) => StatusCode::BAD_GATEWAY,
        DispatchError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DispatchError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Maps a failed dispatch to its HTTP status, naming the stage it died in.
pub fn dispatch_error_response(err: &DispatchError) -> Result<Response<Body>, lambda_http::Error> {
    let body = ErrorBody {
        error: err.to_string(),
        stage: Some(err.stage().as_str()),
    };
    response_with_code(body, dispatch_error_status(err))
}

pub fn response_with_code<T: Serialize>(data: T, code: StatusCode) -> Result<Response<Body>, lambda_http::Error> {
    let body = serde_json::to_string(&data).map_err(|_| lambda_http::Error::from("Serialization error"))?;
    log::info!("Response Code:{}\nBody: {}", code, body);
    Response::builder()
        .status(code)
        .header("Content-Type", "application/json")
        .body(Body::Text(body))
        .map_err(|e| {
            log::error!("Failed to build response: {:?}", e);
            lambda_http::Error::from("Failed to construct HTTP response")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::errors::StoreError;
    use crate::models::errors::{AuthError, DispatchStage};

    fn body_json(response: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    #[test]
    fn test_dispatch_error_statuses() {
        let cases = [
            (DispatchError::NotFound("9".into()), StatusCode::NOT_FOUND),
            (DispatchError::Auth(AuthError::Rejected { status: 401, body: "no".into() }), StatusCode::BAD_GATEWAY),
            (DispatchError::Configuration("bad key".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DispatchError::store(DispatchStage::ResolvingAudience)(StoreError::DynamoDbOperation("throttled".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(dispatch_error_status(&err), status);
        }
    }

    #[test]
    fn test_dispatch_error_body_names_stage() {
        let response = dispatch_error_response(&DispatchError::NotFound("9".into())).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(&response);
        assert_eq!(body["stage"], "loading_ticket");
        assert_eq!(body["error"], "Ticket 9 not found");
    }

    #[test]
    fn test_plain_error_omits_stage() {
        let response = error_response("Invalid request body").unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(&response).get("stage").is_none());
    }
}
