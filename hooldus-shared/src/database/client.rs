use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;

/// DynamoDB client for the Lambda's region. `DYNAMODB_ENDPOINT` points it at
/// DynamoDB Local instead.
pub async fn get_dynamodb_client() -> DynamoDbClient {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Ok(endpoint) = std::env::var("DYNAMODB_ENDPOINT") {
        log::info!("Using DynamoDB endpoint {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }

    DynamoDbClient::new(&loader.load().await)
}
