use super::{ChatMessage, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
// Extremely low temperature for strict factual adherence.
const TEMPERATURE: f32 = 0.15;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    /// The credential comes from the process environment; generation fails
    /// immediately without it. Base URL and model can be overridden the same
    /// way.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn system_instruction(context: &str) -> String {
    format!(
        "You are an expert Energy Domain AI Assistant. \
         Your primary goal is to answer questions based strictly on the provided technical documentation, reports, or research papers.\n\n\
         CONTEXT RULES:\n\
         1. Use only the provided context to answer.\n\
         2. If the answer is not in the context, state that clearly. Do not hallucinate.\n\
         3. Use technical energy sector terminology correctly (e.g., PV efficiency, grid balancing, decarbonization, LCOE).\n\
         4. Provide structured answers (bullet points, clear headings) when appropriate.\n\
         5. Always reference the relevant parts of the document in your explanation.\n\n\
         CURRENT CONTEXT FROM UPLOADED DOCUMENTS:\n{}",
        if context.is_empty() {
            "No context provided. Inform the user you need documents to answer technical questions."
        } else {
            context
        }
    )
}

/// History becomes alternating turns (assistant maps to the `model` role),
/// with the new query as the final user turn.
fn build_contents(history: &[ChatMessage], query: &str) -> Vec<Content> {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|m| Content {
            role: Some(if m.role == "assistant" {
                "model".to_string()
            } else {
                "user".to_string()
            }),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();
    contents.push(Content {
        role: Some("user".to_string()),
        parts: vec![Part {
            text: query.to_string(),
        }],
    });
    contents
}

/// Single complete response; no streaming.
pub async fn generate(
    config: &GeminiConfig,
    query: &str,
    context: &str,
    history: &[ChatMessage],
) -> Result<String, LlmError> {
    let client = Client::new();
    let body = GenerateRequest {
        contents: build_contents(history, query),
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: system_instruction(context),
            }],
        },
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
        },
    };

    let resp = client
        .post(format!(
            "{}/models/{}:generateContent",
            config.base_url, config.model
        ))
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", &config.api_key)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        if status == 429 {
            return Err(LlmError::RateLimited);
        }
        if text.contains("API_KEY_INVALID") || text.contains("API key not valid") {
            return Err(LlmError::InvalidApiKey);
        }
        return Err(LlmError::Api {
            status,
            message: text,
        });
    }

    let data: GenerateResponse = resp.json().await?;
    let text: String = data
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| {
            c.parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}
