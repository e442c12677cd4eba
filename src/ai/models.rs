use async_trait::async_trait;
use thiserror::Error;
use crate::models::User;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    APIError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("No content provider configured")]
    NotConfigured,
}

/// Generative backend for audience profiles and host avatars.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate_users(&self, count: usize) -> Result<Vec<User>, ProviderError>;

    /// Returns an image reference (usually a data URL), or `None` when the
    /// model answered without an image.
    async fn generate_avatar_image(&self, prompt: &str) -> Result<Option<String>, ProviderError>;
}
