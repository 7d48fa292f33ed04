use std::collections::{HashMap, HashSet};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::AttributeValue;
use crate::database::errors::StoreError;
use crate::models::device_token::DeviceToken;
use crate::repositories::{collect_bounded, QUERY_CONCURRENCY};
use crate::utilities::fields::dynamodb;
use crate::utilities::logging::{log_error, log_info};

/// Interface
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn tokens_for_users(&self, user_ids: &HashSet<String>) -> Result<Vec<DeviceToken>, StoreError>;

    /// Deletes every registration carrying `token`, whoever owns it.
    /// Returns how many records were removed; zero when the token is already gone.
    async fn delete_by_token(&self, token: &str) -> Result<usize, StoreError>;
}

/// DynamoDB-backed implementation
///
/// Registrations live under `PK = User#<id>`, `SK = Device#<token>`, with a GSI
/// on `PushToken` so pruning can find a token without knowing its owner.
pub struct DynamoDeviceRepository {
    db: DynamoDbClient,
    table_name: String,
    token_index: String,
}

impl DynamoDeviceRepository {
    pub fn new(db: DynamoDbClient, table_name: String, token_index: String) -> Self {
        Self { db, table_name, token_index }
    }

    async fn query_all(
        &self,
        build: impl Fn() -> aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder,
    ) -> Result<Vec<HashMap<String, AttributeValue>>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let res = build()
                .set_exclusive_start_key(start_key.take())
                .send()
                .await?;

            items.extend(res.items().iter().cloned());

            match res.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn tokens_for_user(&self, user_id: &str) -> Result<Vec<DeviceToken>, StoreError> {
        let pk = format!("{}{}", dynamodb::USER_PREFIX, user_id);

        let items = self
            .query_all(|| {
                self.db
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression("#pk = :pk AND begins_with(#sk, :device)")
                    .expression_attribute_names("#pk", dynamodb::PK_FIELD)
                    .expression_attribute_names("#sk", dynamodb::SK_FIELD)
                    .expression_attribute_values(":pk", AttributeValue::S(pk.clone()))
                    .expression_attribute_values(":device", AttributeValue::S(dynamodb::DEVICE_PREFIX.to_string()))
            })
            .await?;

        items.iter().map(DeviceToken::from_item).collect()
    }
}

#[async_trait]
impl DeviceRepository for DynamoDeviceRepository {
    async fn tokens_for_users(&self, user_ids: &HashSet<String>) -> Result<Vec<DeviceToken>, StoreError> {
        let lookups: Vec<_> = user_ids.iter().map(|user_id| self.tokens_for_user(user_id)).collect();
        let tokens = collect_bounded(lookups, QUERY_CONCURRENCY)
            .await
            .inspect_err(|e| log_error("DynamoDB", &format!("Device lookup failed: {}", e)))?;

        log_info("DynamoDB", &format!("Found {} registrations for {} users", tokens.len(), user_ids.len()));
        Ok(tokens)
    }

    async fn delete_by_token(&self, token: &str) -> Result<usize, StoreError> {
        let items = self
            .query_all(|| {
                self.db
                    .query()
                    .table_name(&self.table_name)
                    .index_name(&self.token_index)
                    .key_condition_expression("#token = :token")
                    .expression_attribute_names("#token", dynamodb::PUSH_TOKEN_FIELD)
                    .expression_attribute_values(":token", AttributeValue::S(token.to_string()))
            })
            .await?;

        let mut removed = 0;
        for item in items {
            let (Some(pk), Some(sk)) = (item.get(dynamodb::PK_FIELD), item.get(dynamodb::SK_FIELD)) else {
                log_error("DynamoDB", "Token index item missing key attributes");
                continue;
            };

            self.db
                .delete_item()
                .table_name(&self.table_name)
                .key(dynamodb::PK_FIELD, pk.clone())
                .key(dynamodb::SK_FIELD, sk.clone())
                .send()
                .await?;
            removed += 1;
        }

        log_info("DynamoDB", &format!("Removed {} registrations for pruned token", removed));
        Ok(removed)
    }
}
