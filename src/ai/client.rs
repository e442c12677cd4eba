use log::{info, warn};
use rand::thread_rng;
use super::fallback::fallback_users;
use super::models::{ContentProvider, ProviderError};
use super::gemini::GeminiProvider;
use crate::models::User;

pub const DEFAULT_AVATAR_PROMPT: &str =
    "A realistic portrait of a friendly social media influencer, professional lighting, photorealistic, 4k";

/// Wraps an optional provider with local fallback, so callers always get usable content.
pub struct ContentClient {
    provider: Option<Box<dyn ContentProvider>>,
}

impl ContentClient {
    pub fn new(gemini_api_key: Option<String>) -> Self {
        Self {
            provider: gemini_api_key
                .filter(|k| !k.trim().is_empty())
                .map(|k| Box::new(GeminiProvider::new(k)) as Box<dyn ContentProvider>),
        }
    }

    pub fn with_provider(provider: Box<dyn ContentProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    pub fn offline() -> Self {
        Self { provider: None }
    }

    pub fn is_online(&self) -> bool {
        self.provider.is_some()
    }

    /// Never fails: provider errors and empty answers fall back to local users.
    pub async fn generate_users(&self, count: usize) -> Vec<User> {
        let generated = match &self.provider {
            Some(provider) => provider.generate_users(count).await,
            None => Err(ProviderError::NotConfigured),
        };

        match generated {
            Ok(users) if !users.is_empty() => {
                info!("Generated {} audience profiles", users.len());
                users
            }
            Ok(_) => {
                warn!("Provider returned no users, using local fallback");
                fallback_users(count, &mut thread_rng())
            }
            Err(ProviderError::NotConfigured) => {
                info!("No content provider configured, using local users");
                fallback_users(count, &mut thread_rng())
            }
            Err(e) => {
                warn!("Failed to generate users: {}. Using local fallback.", e);
                fallback_users(count, &mut thread_rng())
            }
        }
    }

    pub async fn generate_host_avatar(&self, host_name: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let subject = if host_name.trim().is_empty() { "a chinese streamer" } else { host_name };
        let prompt = format!("A high quality profile photo of {}, beauty filter style, bright lighting", subject);
        self.generate_avatar(provider.as_ref(), &prompt).await
    }

    pub async fn generate_avatar_image(&self, prompt: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let prompt = if prompt.trim().is_empty() { DEFAULT_AVATAR_PROMPT } else { prompt };
        self.generate_avatar(provider.as_ref(), prompt).await
    }

    async fn generate_avatar(&self, provider: &dyn ContentProvider, prompt: &str) -> Option<String> {
        match provider.generate_avatar_image(prompt).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to generate avatar: {}", e);
                None
            }
        }
    }
}
