use thiserror::Error;

use crate::error::StoreError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SystemError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),
    #[error("Demo order failed: {0}")]
    Demo(String),
}
