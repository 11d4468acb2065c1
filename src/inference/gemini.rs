//! Gemini `generateContent` over plain HTTPS.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{build_prompt, parse_reading, InferenceError, KeyOracle, KeyReading};
use crate::analysis::AudioFeatures;
use crate::config::GeminiConfig;
use crate::shared::Genre;

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
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

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, InferenceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    #[tracing::instrument(skip(self, features), fields(model = %self.model))]
    fn request(&self, features: &AudioFeatures, genre: Genre) -> Result<KeyReading, InferenceError> {
        let api_key = self.api_key.as_deref().ok_or(InferenceError::MissingApiKey)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(features, genre) }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Status { status: status.as_u16(), body });
        }
        let text = response.text()?;
        debug!(bytes = text.len(), "oracle replied");
        parse_reading(&extract_text(&text)?)
    }
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(body: &str) -> Result<String, InferenceError> {
    let parsed: GenerateResponse = serde_json::from_str(body)?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(InferenceError::EmptyResponse);
    }
    Ok(text)
}

impl KeyOracle for GeminiClient {
    fn detect_key(&self, features: &AudioFeatures, genre: Genre) -> Option<KeyReading> {
        match self.request(features, genre) {
            Ok(reading) => Some(reading),
            Err(e) => {
                // not a session failure: the band just stays where it is
                info!("no key this cycle: {e}");
                None
            }
        }
    }
}
