use std::io;

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum HydrationError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Data plane error: {0}")]
    DataPlane(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

pub type HydrationResult<T> = Result<T, HydrationError>;

impl HydrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HydrationError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HydrationError::DataPlane(_) => StatusCode::BAD_GATEWAY,
            HydrationError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            HydrationError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HydrationError::NotFound(_) => StatusCode::NOT_FOUND,
            HydrationError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<toml::de::Error> for HydrationError {
    fn from(src: toml::de::Error) -> HydrationError {
        HydrationError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for HydrationError {
    fn from(src: toml::ser::Error) -> HydrationError {
        HydrationError::Config(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for HydrationError {
    fn from(src: JsonError) -> HydrationError {
        HydrationError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for HydrationError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => HydrationError::NotFound(format!("{x}")),
            _ => HydrationError::Io(format!("IOError: {}", x.kind())),
        }
    }
}
