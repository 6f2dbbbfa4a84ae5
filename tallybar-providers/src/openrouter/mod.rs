//! OpenRouter provider implementation.
//!
//! OpenRouter is API-token only. The key is read from `OPENROUTER_API_KEY`
//! or the settings store, and usage comes from the credits and key
//! endpoints.

mod api;
mod descriptor;
mod error;
mod strategies;

pub use api::{OpenRouterClient, OpenRouterCredits, OpenRouterKeyInfo};
pub use descriptor::openrouter_descriptor;
pub use error::OpenRouterError;
pub use strategies::OpenRouterApiStrategy;
