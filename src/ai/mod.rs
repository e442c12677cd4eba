mod client;
mod fallback;
mod gemini;
mod models;

pub use client::{ContentClient, DEFAULT_AVATAR_PROMPT};
pub use fallback::{fallback_users, placeholder_avatar};
pub use gemini::GeminiProvider;
pub use models::{ContentProvider, ProviderError};
