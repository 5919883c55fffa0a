use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GeneratorConfig;

use super::extract_json_from_completion;

/// Message in a generation conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Per-call generation parameters
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Model identifier (e.g. "openai:gpt-4o-mini").
    pub model: String,
    /// Optional system instruction prepended to the request.
    pub system: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
}

impl CompletionOptions {
    /// Replace the system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Replace the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "openai:gpt-4o-mini".to_string(),
            system: None,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl From<&GeneratorConfig> for CompletionOptions {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            model: config.model.clone(),
            system: None,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Request to run a completion
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Disable streaming for synchronous responses.
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    /// Build a request for `prompt` using the given options
    pub fn new(prompt: impl Into<String>, options: &CompletionOptions) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &options.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        Self {
            model: options.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        }
    }
}

/// Response from the generation service
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Generated text.
    pub completion: String,
    /// Model that produced the completion.
    pub model: Option<String>,
    /// Token usage information.
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: Option<u32>,
    /// Tokens in the completion.
    pub completion_tokens: Option<u32>,
    /// Total tokens billed.
    pub total_tokens: Option<u32>,
}

/// Content analysis scores, each an integer on a 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// How certain and assertive the text is.
    pub confidence: u8,
    /// How much the text commits to continuing despite obstacles.
    pub perseverance: u8,
    /// 1 = purely analytical, 10 = purely instinctual.
    pub instinct_vs_analysis: u8,
    /// 1 = strongly negative valence, 10 = strongly positive.
    pub emotional_state: u8,
}

/// Neutral midpoint on the 1-10 analysis scale.
const NEUTRAL_ANALYSIS_SCORE: u8 = 5;

impl ContentAnalysis {
    /// The all-5s neutral analysis used when parsing fails
    pub fn neutral() -> Self {
        Self {
            confidence: NEUTRAL_ANALYSIS_SCORE,
            perseverance: NEUTRAL_ANALYSIS_SCORE,
            instinct_vs_analysis: NEUTRAL_ANALYSIS_SCORE,
            emotional_state: NEUTRAL_ANALYSIS_SCORE,
        }
    }

    /// Parse an analysis from completion text, falling back to neutral.
    ///
    /// Unparseable payloads are never an error at this layer.
    pub fn from_completion(completion: &str) -> Self {
        let parsed = extract_json_from_completion(completion)
            .and_then(|json| serde_json::from_str::<ContentAnalysis>(json).map_err(|e| e.to_string()));

        match parsed {
            Ok(analysis) => analysis.clamped(),
            Err(e) => {
                warn!(error = %e, "Failed to parse content analysis, using neutral default");
                Self::neutral()
            }
        }
    }

    /// Force every dimension into 1..=10
    pub fn clamped(self) -> Self {
        Self {
            confidence: self.confidence.clamp(1, 10),
            perseverance: self.perseverance.clamp(1, 10),
            instinct_vs_analysis: self.instinct_vs_analysis.clamp(1, 10),
            emotional_state: self.emotional_state.clamp(1, 10),
        }
    }
}
