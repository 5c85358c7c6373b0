use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, error, warn};

use crate::config::Config;
use crate::schema::{Schema, SchemaMismatch};

/// Which generated artifact a call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Artifact {
    Plan,
    Presentation,
    Handout,
}

impl Artifact {
    pub fn noun(self) -> &'static str {
        match self {
            Artifact::Plan => "lesson plan",
            Artifact::Presentation => "presentation",
            Artifact::Handout => "student handout",
        }
    }
}

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("missing GEMINI_API_KEY")] MissingKey,
    #[error("request cancelled")] Cancelled,
    #[error("Other: {0}")] Other(String),
}

#[derive(Debug, Error)]
pub enum FailureKind {
    #[error(transparent)]
    Transport(#[from] GeminiError),
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response does not match schema: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),
}

/// One failed artifact generation. Displays as the single message shown to the user;
/// the cause stays available for logs.
#[derive(Debug, Error)]
#[error("Failed to generate {} from API.", .artifact.noun())]
pub struct GenerationFailure {
    pub artifact: Artifact,
    #[source]
    pub kind: FailureKind,
}

impl GenerationFailure {
    pub fn new(artifact: Artifact, kind: impl Into<FailureKind>) -> Self {
        Self { artifact, kind: kind.into() }
    }
}

/// One "prompt + schema in, response text out" round trip.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, schema: &Schema, cancel: CancellationToken) -> Result<String, GeminiError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    async fn perform_api_call(&self, api_key: &str, prompt: &str, schema: &Schema) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, self.model, api_key);
        info!("🔗 Making request to: {}", url.replace(api_key, "***"));

        let request_body = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| GeminiError::Http(e.to_string()))?;
        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GeminiError::Http(format!("status={} body={}", status, response_text)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}", e)))?;

        let text = extract_first_text(&parsed).ok_or_else(|| GeminiError::Other("no text content in response".into()))?;
        info!("📦 Received {} chars of generated text", text.len());
        Ok(text)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str, schema: &Schema, cancel: CancellationToken) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingKey)?;
        if cancel.is_cancelled() {
            return Err(GeminiError::Cancelled);
        }
        info!("Generating with {} ({} char prompt)...", self.model, prompt.len());
        tokio::select! {
            _ = cancel.cancelled() => Err(GeminiError::Cancelled),
            result = self.perform_api_call(api_key, prompt, schema) => result,
        }
    }
}

/// Returns the body of the first ```` ```json ```` fenced block, or the whole text when there is none.
pub fn extract_json(raw: &str) -> &str {
    const FENCE: &str = "```json";
    let Some(start) = raw.find(FENCE) else {
        return raw.trim();
    };
    let body = &raw[start + FENCE.len()..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => raw.trim(),
    }
}

/// Decodes extracted JSON, checks it against `schema`, then converts it to `T`.
pub fn parse<T: DeserializeOwned>(artifact: Artifact, schema: &Schema, json_text: &str) -> Result<T, GenerationFailure> {
    let value: serde_json::Value = serde_json::from_str(json_text).map_err(|e| GenerationFailure::new(artifact, e))?;
    schema.check(&value).map_err(|e| GenerationFailure::new(artifact, e))?;
    serde_json::from_value(value).map_err(|e| GenerationFailure::new(artifact, e))
}

/// Runs the whole pipeline for one artifact: generate, unwrap fences, parse.
pub async fn generate_artifact<T: DeserializeOwned>(
    generator: &dyn Generator,
    artifact: Artifact,
    prompt: &str,
    cancel: CancellationToken,
) -> Result<T, GenerationFailure> {
    let schema = Schema::for_artifact(artifact);
    let raw = generator
        .generate(prompt, &schema, cancel)
        .await
        .map_err(|e| GenerationFailure::new(artifact, e))?;
    let json_text = extract_json(&raw);
    if json_text.len() != raw.trim().len() {
        warn!("⚠️ {} response was wrapped in a code fence", artifact.noun());
    }
    parse(artifact, &schema, json_text).inspect_err(|e| error!("❌ {}: {}", e, e.kind))
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde_json::Value),
}

fn extract_first_text(resp: &GeminiResponse) -> Option<String> {
    let candidate = resp.candidates.first()?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::Other(_) => None,
        })
        .collect();
    if text.trim().is_empty() { None } else { Some(text.trim().to_string()) }
}
