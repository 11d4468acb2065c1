//! Key inference: hand the live audio features to a language model and get
//! back a key guess. Every failure collapses to "no reading", which callers
//! treat as "stay on the current key".

pub mod gemini;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::AudioFeatures;
use crate::shared::Genre;

pub use gemini::GeminiClient;

/// The keys the model is asked to choose from.
pub const KEY_CHOICES: &str = "C, D, E, F, G, A, B, Bb, Eb, Ab, Db";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyReading {
    pub key: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub mood: String,
}

pub trait KeyOracle: Send + Sync {
    /// `None` means the oracle had nothing usable this time.
    fn detect_key(&self, features: &AudioFeatures, genre: Genre) -> Option<KeyReading>;
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("no api key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("oracle answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response had no text")]
    EmptyResponse,
    #[error("response is not the expected json: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response has no key")]
    MissingKey,
}

pub fn build_prompt(features: &AudioFeatures, genre: Genre) -> String {
    format!(
        "Act as a master musician. Based on these audio features: \
         avgFreq={:.1}Hz peakFreq={:.1}Hz amp={:.3} spectralCentroid={:.1}Hz. \
         The genre is {}. Identify the most likely musical key ({}). \
         Return JSON: {{\"key\": \"C\", \"confidence\": 0.9, \"mood\": \"joyful\"}}",
        features.avg_frequency,
        features.peak_frequency,
        features.amplitude,
        features.spectral_centroid,
        genre,
        KEY_CHOICES,
    )
}

#[derive(Deserialize)]
struct RawReading {
    key: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    mood: Option<String>,
}

/// Parses the model's JSON answer. A missing or blank `key` is an error.
pub fn parse_reading(text: &str) -> Result<KeyReading, InferenceError> {
    let trimmed = text.trim();
    let raw: RawReading = serde_json::from_str(if trimmed.is_empty() { "{}" } else { trimmed })?;
    let key = raw
        .key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(InferenceError::MissingKey)?;
    Ok(KeyReading {
        key,
        confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        mood: raw.mood.unwrap_or_default(),
    })
}
