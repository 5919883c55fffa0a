//! # Instinct Search
//!
//! An instinct-biased Monte Carlo Tree Search engine for decision support.
//! Given a problem statement and context, the engine grows a tree of
//! candidate approaches (free-text solution sketches) by delegating text
//! generation, scoring, and content analysis to a remote generation service,
//! and returns the highest-scoring path.
//!
//! ## How the search differs from plain MCTS
//!
//! - **Selection** flips a weighted coin per step: with probability
//!   `instinct_ratio` a child is drawn stochastically by emotional valence,
//!   otherwise the instinct-adjusted UCT score decides.
//! - **Expansion** generates children concurrently at a temperature ladder,
//!   then orders them by instinct weight from a content analysis.
//! - **Evaluation** boosts scores for content whose persistence language
//!   outweighs its doubt language.
//! - **Backpropagation** nudges emotional valence along the path in addition
//!   to the usual visit/value updates.
//!
//! ## Example
//!
//! ```ignore
//! use instinct_search::{Config, GeneratorClient, SearchEngine};
//! use instinct_search::generator::CompletionOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = GeneratorClient::new(&config.generator, config.request.clone())?;
//!     let options = CompletionOptions::from(&config.generator);
//!     let mut engine = SearchEngine::new(
//!         client,
//!         "Should we migrate the billing system?",
//!         "Monolith, 40k LOC, two engineers available",
//!         config.search.clone(),
//!         options,
//!     );
//!     let outcome = engine
//!         .run_full_search(config.search.iterations, config.search.simulations_per_iteration)
//!         .await?;
//!     println!("{}", outcome.best_content);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management loaded from the environment.
pub mod config;
/// Search engine: selection, expansion, evaluation, backpropagation.
pub mod engine;
/// Error types and result aliases for the application.
pub mod error;
/// Text-generation collaborator client and trait seam.
pub mod generator;
/// System prompts sent to the generation service.
pub mod prompts;
/// Decision tree layer: arena, nodes, instinct metrics.
pub mod tree;

pub use config::Config;
pub use engine::{EnginePhase, SearchEngine, SearchOutcome, TreeSnapshot};
pub use error::{AppError, AppResult};
pub use generator::{GeneratorClient, TextGenerator};
pub use tree::{DecisionNode, DecisionTree};
