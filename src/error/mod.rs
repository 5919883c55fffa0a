use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },

    /// Failure in the text-generation collaborator.
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Failure in the search engine or tree layer.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

/// Text-generation service errors
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The service stayed unreachable after all retries.
    #[error("Generator unavailable: {message} (retries: {retries})")]
    Unavailable {
        /// Last observed error.
        message: String,
        /// Number of retries attempted.
        retries: u32,
    },

    /// Non-success HTTP response from the service.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// What failed to parse.
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Search engine and tree errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// A structural operation was attempted before `initialize`.
    #[error("Engine not initialized: no root node exists")]
    Uninitialized,

    /// An operation referenced a node id not present in the tree.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The id that failed to resolve.
        node_id: String,
    },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for generator operations
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;
