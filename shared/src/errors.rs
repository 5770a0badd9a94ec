//! Shared error types for the service starter harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid property (expected key=value): {input}")]
    InvalidProperty { input: String },

    #[error("Invalid key material: {message}")]
    InvalidKeyMaterial { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
