//! Language-model capability.
//!
//! The core only needs `complete(instruction) -> text`. Provider clients,
//! credentials and transport live with the caller.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A structuring instruction ready to send to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub system: String,
    pub user: String,
    /// Ask the provider to constrain output to a JSON object where supported
    pub json_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider/model identifier for logging
    fn name(&self) -> &str;

    async fn complete(&self, instruction: &Instruction) -> Result<String, ModelError>;
}
