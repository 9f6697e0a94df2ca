pub mod gemini;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Gemini API key is missing. Set GEMINI_API_KEY in the environment.")]
    MissingApiKey,
    #[error("Invalid Gemini API key. Please check your settings.")]
    InvalidApiKey,
    #[error("Rate limit exceeded. Please wait a moment before asking another question.")]
    RateLimited,
    #[error("Gemini returned an empty response. This may be due to safety filters or context length.")]
    EmptyResponse,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini API error: {status} - {message}")]
    Api { status: u16, message: String },
}
