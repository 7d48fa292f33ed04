use std::fmt;
use aws_sdk_dynamodb::error::SdkError;

#[derive(Debug)]
pub enum StoreError {
    DynamoDbOperation(String),
    MissingAttribute(&'static str),
    InvalidAttribute { attribute: &'static str, value: String },
}

impl<E, R> From<SdkError<E, R>> for StoreError
where
    E: std::error::Error + Send + Sync + 'static,
    R: fmt::Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        StoreError::DynamoDbOperation(format!("{}", aws_sdk_dynamodb::error::DisplayErrorContext(&err)))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DynamoDbOperation(e) => write!(f, "DynamoDB operation failed: {}", e),
            StoreError::MissingAttribute(name) => write!(f, "Stored item is missing attribute {}", name),
            StoreError::InvalidAttribute { attribute, value } =>
                write!(f, "Stored item has invalid {}: {}", attribute, value),
        }
    }
}

impl std::error::Error for StoreError {}
