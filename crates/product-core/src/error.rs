use std::time::Duration;

use thiserror::Error;

/// Core errors for the product store.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("DynamoDB error: {0}")]
    Dynamo(#[from] aws_sdk_dynamodb::Error),

    #[error("Invalid product data: {0}")]
    Model(#[from] crate::model::ModelError),

    #[error("Unsupported attribute type for {0}")]
    UnsupportedAttribute(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
}
