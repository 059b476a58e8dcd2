//! Wire types of the AI worker's HTTP API.

use serde::{Deserialize, Serialize};

/// One chunk of raw audio for a streaming transcription session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub session_id: String,
    pub data: Vec<u8>,
    /// Sent as `x-final: true`. Without it the worker answers with a partial
    /// transcript; with it, the final one.
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrPartial {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrFinal {
    pub text: String,
    #[serde(default)]
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrResponse {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub partial: Option<AsrPartial>,
    #[serde(default, rename = "final")]
    pub final_result: Option<AsrFinal>,
    #[serde(default)]
    pub detections: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResponse {
    pub results: Vec<ModerationResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthzResponse {
    pub status: String,
}

/// Argument of every guarded worker operation.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerRequest {
    Transcribe(AudioChunk),
    Moderate(ModerationRequest),
}

impl WorkerRequest {
    /// Identifier of the operation that serves this request.
    pub fn operation_id(&self) -> &'static str {
        match self {
            Self::Transcribe(_) => super::TRANSCRIBE,
            Self::Moderate(_) => super::MODERATE,
        }
    }
}

/// Result of every guarded worker operation.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Transcription(AsrResponse),
    Moderation(ModerationResponse),
}

fn default_status() -> String {
    "ok".to_string()
}
