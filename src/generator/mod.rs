//! Text-generation collaborator: client, wire types, and the trait seam
//! consumed by the search engine.
//!
//! The engine only depends on the [`TextGenerator`] trait; [`GeneratorClient`]
//! is the HTTP implementation. Tests substitute deterministic stubs.

mod client;
mod types;

pub use client::GeneratorClient;
pub use types::{
    CompletionOptions, CompletionRequest, CompletionResponse, ContentAnalysis, Message,
    MessageRole, Usage,
};

use async_trait::async_trait;

use crate::error::GeneratorResult;

/// The contract the search engine holds against the text-generation service.
///
/// Every method is a suspension point; the engine has no other ones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Request a single completion for `prompt`.
    async fn generate_completion(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> GeneratorResult<String>;

    /// Request `count` completions concurrently, each at a successively
    /// increased temperature to diversify outputs. Results are returned in
    /// issue order regardless of completion order.
    async fn generate_multiple_completions(
        &self,
        prompt: &str,
        count: usize,
        options: &CompletionOptions,
    ) -> GeneratorResult<Vec<String>>;

    /// Score `text` on the four instinct dimensions (1-10 each).
    ///
    /// Parse failures resolve to the neutral all-5s analysis; only transport
    /// failures surface as errors.
    async fn analyze_content(&self, text: &str) -> GeneratorResult<ContentAnalysis>;
}

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Try parsing as raw JSON first (fast path)
/// 2. Extract from ```json ... ``` code blocks
/// 3. Extract from ``` ... ``` code blocks
/// 4. Return error if none work
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    // Fast path: raw JSON
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    // Try ```json ... ``` blocks
    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    // Try ``` ... ``` blocks
    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}
