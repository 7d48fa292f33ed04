use lambda_http::Request;
use serde::de::DeserializeOwned;

/// API Gateway stage prefixes that precede every route.
const STAGE_PREFIXES: [&str; 2] = ["/dev", "/prod"];

/// Decodes the JSON body of `event` into `T`. An empty body is treated as `{}`.
pub fn parse_body<T: DeserializeOwned>(event: &Request) -> Result<T, String> {
    let bytes = event.body().as_ref();
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) { b"{}" } else { bytes };
    serde_json::from_slice(bytes).map_err(|e| format!("Invalid request body: {}", e))
}

/// Drops a leading stage prefix so `/dev/notify` and `/notify` route alike.
pub fn strip_stage_prefix(path: &str) -> &str {
    for prefix in STAGE_PREFIXES {
        if let Some(rest) = path.strip_prefix(prefix) {
            if rest.is_empty() {
                return "/";
            }
            if rest.starts_with('/') {
                return rest;
            }
        }
    }
    path
}
