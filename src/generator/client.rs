use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{CompletionOptions, CompletionRequest, CompletionResponse, ContentAnalysis};
use super::TextGenerator;
use crate::config::{GeneratorConfig, RequestConfig};
use crate::error::{GeneratorError, GeneratorResult};
use crate::prompts::CONTENT_ANALYSIS_PROMPT;

/// Temperature increase per additional parallel completion.
const TEMPERATURE_STEP: f64 = 0.1;

/// Upper bound for the diversification temperature ladder.
const MAX_TEMPERATURE: f64 = 1.5;

/// Sampling temperature for content analysis calls.
const ANALYSIS_TEMPERATURE: f64 = 0.2;

/// Token cap for content analysis calls.
const ANALYSIS_MAX_TOKENS: u32 = 128;

/// HTTP client for the text-generation service
#[derive(Clone)]
pub struct GeneratorClient {
    client: Client,
    base_url: String,
    api_key: String,
    defaults: CompletionOptions,
    request_config: RequestConfig,
}

impl GeneratorClient {
    /// Create a new generator client
    pub fn new(config: &GeneratorConfig, request_config: RequestConfig) -> GeneratorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(GeneratorError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            defaults: CompletionOptions::from(config),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default per-call options derived from the service configuration
    pub fn default_options(&self) -> CompletionOptions {
        self.defaults.clone()
    }

    /// Run a completion request with bounded retries
    async fn run_completion(&self, request: CompletionRequest) -> GeneratorResult<CompletionResponse> {
        let url = format!("{}/v1/completions", self.base_url);
        let model = request.model.clone();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    model = %model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying generation request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    let latency = start.elapsed();
                    info!(
                        model = %model,
                        latency_ms = latency.as_millis(),
                        "Generation call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        model = %model,
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Generation call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(GeneratorError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &CompletionRequest,
    ) -> GeneratorResult<CompletionResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.temperature,
            "Calling generation service"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    GeneratorError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| GeneratorError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(completion)
    }
}

#[async_trait]
impl TextGenerator for GeneratorClient {
    async fn generate_completion(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> GeneratorResult<String> {
        let request = CompletionRequest::new(prompt, options);
        let response = self.run_completion(request).await?;
        Ok(response.completion)
    }

    async fn generate_multiple_completions(
        &self,
        prompt: &str,
        count: usize,
        options: &CompletionOptions,
    ) -> GeneratorResult<Vec<String>> {
        // Temperature ladder: each parallel request samples hotter than the
        // previous one so the variants diverge.
        let calls = (0..count).map(|i| {
            let stepped = options.clone().with_temperature(
                (options.temperature + i as f64 * TEMPERATURE_STEP).min(MAX_TEMPERATURE),
            );
            async move { self.generate_completion(prompt, &stepped).await }
        });

        // try_join_all preserves issue order in its output.
        try_join_all(calls).await
    }

    async fn analyze_content(&self, text: &str) -> GeneratorResult<ContentAnalysis> {
        let options = self
            .default_options()
            .with_system(CONTENT_ANALYSIS_PROMPT)
            .with_temperature(ANALYSIS_TEMPERATURE)
            .with_max_tokens(ANALYSIS_MAX_TOKENS);

        let prompt = format!("Analyze the following text:\n\n{}", text);
        let completion = self.generate_completion(&prompt, &options).await?;

        Ok(ContentAnalysis::from_completion(&completion))
    }
}
