use std::env;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Text-generation service settings.
    pub generator: GeneratorConfig,
    /// HTTP request behavior.
    pub request: RequestConfig,
    /// Search tunables.
    pub search: SearchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Text-generation service configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Service base URL.
    pub base_url: String,
    /// Model identifier passed on every request.
    pub model: String,
    /// Default sampling temperature.
    pub temperature: f64,
    /// Default completion token cap.
    pub max_tokens: u32,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Bounded retry count for failed calls.
    pub max_retries: u32,
    /// Base delay between retries (doubles per attempt).
    pub retry_delay_ms: u64,
}

/// Search engine tunables
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// UCT exploration coefficient, must be positive.
    pub exploration_weight: f64,
    /// Probability of the stochastic instinct choice during selection, in [0,1].
    pub instinct_ratio: f64,
    /// Amplifies exploration by a node's emotional state.
    pub confidence_bias: f64,
    /// Flat selection bonus and evaluation-score multiplier.
    pub perseverance_factor: f64,
    /// Number of search rounds in a full search.
    pub iterations: u32,
    /// Simulations per search round.
    pub simulations_per_iteration: u32,
    /// Children generated per expansion step.
    pub children_per_expansion: usize,
    /// Optional RNG seed for reproducible selection and node ids.
    pub seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug").
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// Newline-delimited JSON output.
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let generator = GeneratorConfig {
            api_key: env::var("GENERATOR_API_KEY").map_err(|_| AppError::Config {
                message: "GENERATOR_API_KEY is required".to_string(),
            })?,
            base_url: env::var("GENERATOR_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            model: env::var("GENERATOR_MODEL")
                .unwrap_or_else(|_| "openai:gpt-4o-mini".to_string()),
            temperature: env::var("GENERATOR_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.7),
            max_tokens: env::var("GENERATOR_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024),
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let search = SearchConfig {
            exploration_weight: env::var("EXPLORATION_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.4),
            instinct_ratio: env::var("INSTINCT_RATIO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.6),
            confidence_bias: env::var("CONFIDENCE_BIAS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.2),
            perseverance_factor: env::var("PERSEVERANCE_FACTOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.7),
            iterations: env::var("SEARCH_ITERATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            simulations_per_iteration: env::var("SIMULATIONS_PER_ITERATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            children_per_expansion: env::var("CHILDREN_PER_EXPANSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            seed: env::var("SEARCH_SEED").ok().and_then(|s| s.parse().ok()),
        };

        search.validate()?;

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            generator,
            request,
            search,
            logging,
        })
    }
}

impl SearchConfig {
    /// Validate tunable ranges
    pub fn validate(&self) -> Result<(), AppError> {
        if self.exploration_weight <= 0.0 {
            return Err(AppError::Config {
                message: format!(
                    "EXPLORATION_WEIGHT must be positive, got {}",
                    self.exploration_weight
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.instinct_ratio) {
            return Err(AppError::Config {
                message: format!(
                    "INSTINCT_RATIO must be within [0,1], got {}",
                    self.instinct_ratio
                ),
            });
        }
        if self.iterations == 0 || self.simulations_per_iteration == 0 {
            return Err(AppError::Config {
                message: "SEARCH_ITERATIONS and SIMULATIONS_PER_ITERATION must be at least 1"
                    .to_string(),
            });
        }
        if self.children_per_expansion == 0 {
            return Err(AppError::Config {
                message: "CHILDREN_PER_EXPANSION must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_weight: 1.4,
            instinct_ratio: 0.6,
            confidence_bias: 0.2,
            perseverance_factor: 0.7,
            iterations: 3,
            simulations_per_iteration: 5,
            children_per_expansion: 2,
            seed: None,
        }
    }
}
