use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::AttributeValue;
use crate::database::errors::StoreError;
use crate::models::ticket::Ticket;
use crate::utilities::fields::dynamodb;
use crate::utilities::logging::log_error;

/// Read access to tickets owned by the CRUD layer.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError>;
}

/// DynamoDB-backed implementation
pub struct DynamoTicketRepository {
    db: DynamoDbClient,
    table_name: String,
}

impl DynamoTicketRepository {
    pub fn new(db: DynamoDbClient, table_name: String) -> Self {
        Self { db, table_name }
    }
}

#[async_trait]
impl TicketRepository for DynamoTicketRepository {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        let pk = format!("{}{}", dynamodb::TICKET_PREFIX, ticket_id);

        let res = self
            .db
            .get_item()
            .table_name(&self.table_name)
            .key(dynamodb::PK_FIELD, AttributeValue::S(pk))
            .key(dynamodb::SK_FIELD, AttributeValue::S(dynamodb::TICKET_SK.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                log_error("DynamoDB", &format!("Failed to fetch ticket {}: {}", ticket_id, e));
                StoreError::from(e)
            })?;

        match res.item {
            Some(item) => Ok(Some(Ticket::from_item(&item)?)),
            None => Ok(None),
        }
    }
}
