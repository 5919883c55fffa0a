use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use instinct_search::{
    config::Config,
    generator::{CompletionOptions, GeneratorClient},
    SearchEngine,
};

/// Run an instinct-biased MCTS decision search over a problem statement.
#[derive(Debug, Parser)]
#[command(name = "instinct-search", version, about)]
struct Cli {
    /// The problem statement to explore
    #[arg(long)]
    problem: String,

    /// Free-form context for the problem
    #[arg(long, default_value = "")]
    context: String,

    /// Override the configured number of search rounds
    #[arg(long)]
    iterations: Option<u32>,

    /// Override the configured simulations per round
    #[arg(long)]
    simulations: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Instinct search starting..."
    );

    // Initialize the generation client
    let client = match GeneratorClient::new(&config.generator, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.generator.base_url, "Generator client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize generator client");
            return Err(e.into());
        }
    };

    let iterations = cli.iterations.unwrap_or(config.search.iterations);
    let simulations = cli
        .simulations
        .unwrap_or(config.search.simulations_per_iteration);
    let options = CompletionOptions::from(&config.generator);

    let mut engine = SearchEngine::new(
        client,
        cli.problem,
        cli.context,
        config.search.clone(),
        options,
    );

    // Stream progress as the tree grows.
    let mut snapshots = engine.subscribe();
    let progress = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.recv().await {
            info!(
                nodes = snapshot.node_count(),
                selected = snapshot.selected_node_id.as_deref().unwrap_or("-"),
                "Tree updated"
            );
        }
    });

    let outcome = match engine.run_full_search(iterations, simulations).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Search failed");
            return Err(e.into());
        }
    };
    drop(engine);
    let _ = progress.await;

    info!(
        best_node = %outcome.best_node.id,
        best_score = outcome.best_score,
        snapshots = outcome.history.len(),
        "Search complete"
    );

    println!("{}", outcome.best_content);
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        instinct_search::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        instinct_search::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
