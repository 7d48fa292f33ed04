use std::collections::{HashMap, HashSet};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::AttributeValue;
use crate::database::errors::StoreError;
use crate::models::roles::Role;
use crate::repositories::{collect_bounded, QUERY_CONCURRENCY};
use crate::utilities::fields::dynamodb;
use crate::utilities::logging::{log_error, log_info};

/// Role-membership lookup: which users hold any of the given roles.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn users_with_roles(&self, roles: &HashSet<Role>) -> Result<HashSet<String>, StoreError>;
}

/// Role items are stored as `PK = User#<id>`, `SK = Role#<role>` and queried
/// through a GSI partitioned on the `Role` attribute.
pub struct DynamoRoleRepository {
    db: DynamoDbClient,
    table_name: String,
    index_name: String,
}

impl DynamoRoleRepository {
    pub fn new(db: DynamoDbClient, table_name: String, index_name: String) -> Self {
        Self { db, table_name, index_name }
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<String>, StoreError> {
        let mut users = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let res = self
                .db
                .query()
                .table_name(&self.table_name)
                .index_name(&self.index_name)
                .key_condition_expression("#role = :role")
                .expression_attribute_names("#role", dynamodb::ROLE_FIELD)
                .expression_attribute_values(":role", AttributeValue::S(role.as_str().to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await?;

            for item in res.items() {
                match item.get(dynamodb::USER_ID_FIELD).and_then(|v| v.as_s().ok()) {
                    Some(user_id) => users.push(user_id.clone()),
                    None => log_error("DynamoDB", &format!("Role item for {} missing UserId", role)),
                }
            }

            match res.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(users)
    }
}

#[async_trait]
impl RoleRepository for DynamoRoleRepository {
    async fn users_with_roles(&self, roles: &HashSet<Role>) -> Result<HashSet<String>, StoreError> {
        let lookups: Vec<_> = roles.iter().map(|role| self.users_with_role(*role)).collect();
        let users: HashSet<String> = collect_bounded(lookups, QUERY_CONCURRENCY)
            .await?
            .into_iter()
            .collect();

        log_info("DynamoDB", &format!("Resolved {} users for {} roles", users.len(), roles.len()));
        Ok(users)
    }
}
