//! Search engine: the select → expand → evaluate → backpropagate cycle.
//!
//! The engine owns the tree root, a timeline of tree snapshots, and the
//! seeded randomness behind stochastic selection and node-id assignment.
//! Every call into the text-generation collaborator is a suspension point;
//! everything else is synchronous, so no two structural mutations of the
//! same node can interleave.

mod snapshot;

pub use snapshot::{NodeSnapshot, TreeSnapshot};

use std::time::Instant;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::{AppError, AppResult, SearchError, SearchResult};
use crate::generator::{CompletionOptions, ContentAnalysis, TextGenerator};
use crate::prompts::{EVALUATION_PROMPT, INITIAL_APPROACH_PROMPT, NEXT_STEP_PROMPT};
use crate::tree::{DecisionNode, DecisionTree, MetricsUpdate, SelectionCoefficients};

/// Neutral fallback for unparseable or failed evaluations.
const NEUTRAL_SCORE: f64 = 5.0;

/// Evaluations and analyses arrive on a 1-10 scale; dividing by this maps
/// them onto [0,1].
const SCORE_SCALE: f64 = 10.0;

/// Fraction of the normalized score delta folded into emotional state on
/// each backpropagation step.
const EMOTION_DRIFT_RATE: f64 = 0.2;

/// Floor added to every child's emotional weight during stochastic
/// selection so a zero-valence child keeps a nonzero draw probability.
const EMOTION_WEIGHT_FLOOR: f64 = 0.01;

/// Sampling temperature for evaluation calls.
const EVALUATION_TEMPERATURE: f64 = 0.1;

/// Token cap for evaluation calls; a bare integer is expected back.
const EVALUATION_MAX_TOKENS: u32 = 16;

/// A selected leaf with this many children or more is evaluated directly
/// instead of being expanded again.
const EXPANSION_CHILD_TARGET: usize = 2;

/// Phrases counted as persistence language by the evaluation bonus.
const PERSEVERANCE_INDICATORS: &[&str] = &[
    "continue",
    "persist",
    "keep going",
    "don't give up",
    "try again",
    "despite",
    "nevertheless",
    "however",
    "still worth",
    "potential",
    "opportunity",
    "challenge",
];

/// Phrases counted as doubt language by the evaluation bonus.
const DOUBT_INDICATORS: &[&str] = &[
    "stop",
    "quit",
    "abandon",
    "too difficult",
    "impossible",
    "not worth",
    "failure",
    "unlikely",
    "risky",
    "doubt",
];

/// Lifecycle phase of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// No root exists yet.
    Uninitialized,
    /// A root exists; no simulations have run.
    Initialized,
    /// Simulations are in progress (re-entrant).
    Searching,
    /// A full search has completed; results are available.
    Settled,
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnginePhase::Uninitialized => write!(f, "uninitialized"),
            EnginePhase::Initialized => write!(f, "initialized"),
            EnginePhase::Searching => write!(f, "searching"),
            EnginePhase::Settled => write!(f, "settled"),
        }
    }
}

/// Result of a full search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Content of the best node found.
    pub best_content: String,
    /// The best node itself, cloned out of the tree.
    pub best_node: DecisionNode,
    /// The best fresh evaluation score observed across rounds.
    pub best_score: f64,
    /// Complete snapshot history, oldest first.
    pub history: Vec<TreeSnapshot>,
}

/// Instinct-biased MCTS over free-text approaches.
///
/// The engine assumes single-writer access to its tree; callers that want to
/// abandon a running search discard the engine instance.
pub struct SearchEngine<G> {
    generator: G,
    problem: String,
    context: String,
    config: SearchConfig,
    options: CompletionOptions,
    coefficients: SelectionCoefficients,
    tree: Option<DecisionTree>,
    selected_node_id: Option<String>,
    phase: EnginePhase,
    history: Vec<TreeSnapshot>,
    watchers: Vec<mpsc::UnboundedSender<TreeSnapshot>>,
    rng: StdRng,
    search_id: String,
}

impl<G: TextGenerator> SearchEngine<G> {
    /// Create an engine for one problem/context pair.
    ///
    /// `options` carries the model defaults used for every collaborator
    /// call; the search tunables come from `config`. A configured seed makes
    /// stochastic selection and node-id assignment reproducible.
    pub fn new(
        generator: G,
        problem: impl Into<String>,
        context: impl Into<String>,
        config: SearchConfig,
        options: CompletionOptions,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let coefficients = SelectionCoefficients {
            exploration_weight: config.exploration_weight,
            confidence_bias: config.confidence_bias,
            perseverance_factor: config.perseverance_factor,
        };

        Self {
            generator,
            problem: problem.into(),
            context: context.into(),
            config,
            options,
            coefficients,
            tree: None,
            selected_node_id: None,
            phase: EnginePhase::Uninitialized,
            history: Vec::new(),
            watchers: Vec::new(),
            rng,
            search_id: Uuid::new_v4().to_string(),
        }
    }

    /// The live tree, if initialized
    pub fn tree(&self) -> Option<&DecisionTree> {
        self.tree.as_ref()
    }

    /// Snapshot history, oldest first
    pub fn history(&self) -> &[TreeSnapshot] {
        &self.history
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Id of the most recently selected node
    pub fn selected_node_id(&self) -> Option<&str> {
        self.selected_node_id.as_deref()
    }

    /// Correlation id for this engine instance's log lines
    pub fn search_id(&self) -> &str {
        &self.search_id
    }

    /// Subscribe to snapshot events.
    ///
    /// A snapshot is published after initialization and after every
    /// completed simulation step. Dropped receivers are pruned silently; an
    /// observer failure never reaches the engine.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TreeSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.push(tx);
        rx
    }

    /// Build the root node from an initial completion and its content
    /// analysis.
    ///
    /// Replaces any existing tree. Collaborator failures propagate; there is
    /// no retry at this layer beyond the client's own bounded retries.
    pub async fn initialize(&mut self) -> AppResult<String> {
        let prompt = format!(
            "Problem:\n{}\n\nContext:\n{}\n\nPropose an initial approach.",
            self.problem, self.context
        );
        let options = self.options.clone().with_system(INITIAL_APPROACH_PROMPT);
        let content = self.generator.generate_completion(&prompt, &options).await?;

        let root_id = self.next_node_id();
        let root = DecisionNode::root(root_id.clone(), content.clone(), self.coefficients);
        self.tree = Some(DecisionTree::new(root));
        self.selected_node_id = Some(root_id.clone());

        let analysis = self.generator.analyze_content(&content).await?;
        let update = MetricsUpdate {
            emotional_state: Some(f64::from(analysis.emotional_state) / SCORE_SCALE),
            instinct_weight: Some(f64::from(analysis.instinct_vs_analysis) / SCORE_SCALE),
            ..MetricsUpdate::default()
        };
        self.tree_mut()?.update_metrics(&root_id, &update)?;

        self.phase = EnginePhase::Initialized;
        self.record_snapshot();

        info!(
            search_id = %self.search_id,
            root_id = %root_id,
            "Search tree initialized"
        );
        Ok(root_id)
    }

    /// Descend from the root to a leaf and record it as selected.
    ///
    /// At each internal node, with probability `instinct_ratio` a child is
    /// drawn stochastically by emotional weight; otherwise the child with
    /// the strictly greatest selection score wins (first-encountered on
    /// ties). The score function is never consulted on the stochastic path.
    pub fn select(&mut self) -> AppResult<String> {
        let tree = self.tree.as_ref().ok_or(SearchError::Uninitialized)?;

        let mut current = tree.root_id().to_string();
        loop {
            let node = tree.get(&current)?;
            if node.children.is_empty() {
                break;
            }
            current = if self.rng.gen::<f64>() < self.config.instinct_ratio {
                Self::instinct_choice(tree, &node.children, &mut self.rng)
            } else {
                Self::analytical_choice(tree, &node.children)
            };
        }

        self.selected_node_id = Some(current.clone());
        debug!(search_id = %self.search_id, selected = %current, "Leaf selected");
        Ok(current)
    }

    /// Weighted-random child draw over emotional state (inverse CDF).
    fn instinct_choice(tree: &DecisionTree, children: &[String], rng: &mut StdRng) -> String {
        let weights: Vec<f64> = children
            .iter()
            .map(|id| {
                let valence = tree
                    .get(id)
                    .map(|child| child.metrics.emotional_state)
                    .unwrap_or(0.0);
                valence + EMOTION_WEIGHT_FLOOR
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let mut draw = rng.gen::<f64>() * total;
        for (id, weight) in children.iter().zip(&weights) {
            draw -= weight;
            if draw <= 0.0 {
                return id.clone();
            }
        }
        // Floating-point remainder lands on the last child.
        children[children.len() - 1].clone()
    }

    /// Argmax over selection scores, first-encountered on ties.
    fn analytical_choice(tree: &DecisionTree, children: &[String]) -> String {
        let mut best_id = &children[0];
        let mut best_score = tree.selection_score(best_id);
        for id in &children[1..] {
            let score = tree.selection_score(id);
            if score > best_score {
                best_id = id;
                best_score = score;
            }
        }
        best_id.clone()
    }

    /// Expand `node_id` with `num_children` generated next steps.
    ///
    /// Generation requests are issued concurrently but children attach in
    /// issue order, so tree structure stays deterministic given
    /// deterministic inputs. Each child is analyzed and its instinct metrics
    /// set from the analysis; children already attached survive a later
    /// failure in the same call. Returns the most-instinctual child.
    pub async fn expand(&mut self, node_id: &str, num_children: usize) -> AppResult<String> {
        let parent_content = self.tree_ref()?.get(node_id)?.content.clone();
        let prompt = format!(
            "Problem:\n{}\n\nContext:\n{}\n\nCurrent approach:\n{}\n\nPropose the next step.",
            self.problem, self.context, parent_content
        );
        let options = self.options.clone().with_system(NEXT_STEP_PROMPT);
        let texts = self
            .generator
            .generate_multiple_completions(&prompt, num_children, &options)
            .await?;

        for content in texts {
            let child_id = self.next_node_id();
            self.tree_mut()?.add_child(node_id, &child_id, &content)?;

            let analysis = self.generator.analyze_content(&content).await?;
            self.tree_mut()?
                .update_metrics(&child_id, &metrics_from_analysis(&analysis))?;
        }

        self.tree_mut()?.sort_children_by_instinct(node_id)?;

        let best = self
            .tree_ref()?
            .get(node_id)?
            .children
            .first()
            .cloned()
            .ok_or_else(|| AppError::Internal {
                message: format!("expansion of {} produced no children", node_id),
            })?;

        debug!(
            search_id = %self.search_id,
            node_id = %node_id,
            children = num_children,
            best = %best,
            "Node expanded"
        );
        Ok(best)
    }

    /// Score a node's content on the 1-10 scale.
    ///
    /// Applies the perseverance bonus when the content shows strictly more
    /// persistence language than doubt language. Never fails: a flaky
    /// scoring call is logged and yields the neutral score, so it cannot
    /// abort a running search.
    pub async fn evaluate(&self, node_id: &str) -> f64 {
        let Some(tree) = self.tree.as_ref() else {
            warn!(node_id = %node_id, "Evaluate called before initialization, using neutral score");
            return NEUTRAL_SCORE;
        };
        let node = match tree.get(node_id) {
            Ok(node) => node,
            Err(e) => {
                warn!(error = %e, "Evaluate called with unknown node, using neutral score");
                return NEUTRAL_SCORE;
            }
        };

        let prompt = format!(
            "Problem:\n{}\n\nApproach:\n{}\n\nRate this approach.",
            self.problem, node.content
        );
        let options = self
            .options
            .clone()
            .with_system(EVALUATION_PROMPT)
            .with_temperature(EVALUATION_TEMPERATURE)
            .with_max_tokens(EVALUATION_MAX_TOKENS);

        let raw = match self.generator.generate_completion(&prompt, &options).await {
            Ok(text) => parse_first_integer(&text)
                .map(|n| (n.clamp(1, 10)) as f64)
                .unwrap_or(NEUTRAL_SCORE),
            Err(e) => {
                warn!(
                    search_id = %self.search_id,
                    node_id = %node_id,
                    error = %e,
                    "Evaluation call failed, using neutral score"
                );
                return NEUTRAL_SCORE;
            }
        };

        if shows_perseverance(&node.content) {
            raw * (1.0 + node.coefficients.perseverance_factor)
        } else {
            raw
        }
    }

    /// Propagate `score` from `node_id` up through every ancestor,
    /// root inclusive.
    ///
    /// Each node on the path gains one visit, accumulates the score, and has
    /// its emotional state nudged toward the normalized score, clamped to
    /// [0,1].
    pub fn backpropagate(&mut self, node_id: &str, score: f64) -> AppResult<()> {
        let tree = self.tree.as_mut().ok_or(SearchError::Uninitialized)?;
        let drift = ((score / SCORE_SCALE) - 0.5) * EMOTION_DRIFT_RATE;

        let mut current = Some(node_id.to_string());
        while let Some(id) = current {
            let node = tree.get_mut(&id)?;
            node.visits += 1;
            node.value += score;
            node.metrics.emotional_state =
                (node.metrics.emotional_state + drift).clamp(0.0, 1.0);
            node.updated_at = Utc::now();
            current = node.parent_id.clone();
        }
        Ok(())
    }

    /// Run `num_simulations` select/expand/evaluate/backpropagate cycles.
    ///
    /// A snapshot is recorded and published after every completed
    /// simulation. Returns the best node by visit count.
    pub async fn run_iteration(&mut self, num_simulations: u32) -> AppResult<String> {
        if self.tree.is_none() {
            return Err(SearchError::Uninitialized.into());
        }
        self.phase = EnginePhase::Searching;

        for simulation in 0..num_simulations {
            let leaf = self.select()?;
            let target = if self.tree_ref()?.get(&leaf)?.children.len() < EXPANSION_CHILD_TARGET {
                self.expand(&leaf, self.config.children_per_expansion).await?
            } else {
                leaf.clone()
            };

            let score = self.evaluate(&target).await;
            self.backpropagate(&target, score)?;
            self.record_snapshot();

            debug!(
                search_id = %self.search_id,
                simulation = simulation + 1,
                selected = %leaf,
                evaluated = %target,
                score = score,
                "Simulation complete"
            );
        }

        self.best_node()
    }

    /// Id of the recommended node: descend by strictly greatest visit count
    pub fn best_node(&self) -> AppResult<String> {
        let tree = self.tree.as_ref().ok_or(SearchError::Uninitialized)?;
        Ok(tree.most_visited_leaf().id.clone())
    }

    /// Run a complete search: initialize when needed, then `iterations`
    /// rounds of `simulations_per_iteration` simulations.
    ///
    /// After each round the round's best node is re-evaluated for a fresh
    /// score, independent of the scores accumulated during simulation, and
    /// the running maximum is kept.
    pub async fn run_full_search(
        &mut self,
        iterations: u32,
        simulations_per_iteration: u32,
    ) -> AppResult<SearchOutcome> {
        let start = Instant::now();

        if self.tree.is_none() {
            self.initialize().await?;
        }

        let mut best: Option<(String, f64)> = None;
        for round in 0..iterations.max(1) {
            let candidate = self.run_iteration(simulations_per_iteration).await?;
            let score = self.evaluate(&candidate).await;

            let improved = best.as_ref().map_or(true, |(_, leader)| score > *leader);
            if improved {
                best = Some((candidate.clone(), score));
            }

            info!(
                search_id = %self.search_id,
                round = round + 1,
                candidate = %candidate,
                score = score,
                improved = improved,
                "Search round complete"
            );
        }

        self.phase = EnginePhase::Settled;

        let (best_id, best_score) = best.ok_or_else(|| AppError::Internal {
            message: "search completed without a best node".to_string(),
        })?;
        let best_node = self.tree_ref()?.get(&best_id)?.clone();

        info!(
            search_id = %self.search_id,
            best_node = %best_id,
            best_score = best_score,
            nodes = self.tree_ref()?.node_count(),
            latency_ms = start.elapsed().as_millis() as i64,
            "Search settled"
        );

        Ok(SearchOutcome {
            best_content: best_node.content.clone(),
            best_node,
            best_score,
            history: self.history.clone(),
        })
    }

    fn tree_ref(&self) -> SearchResult<&DecisionTree> {
        self.tree.as_ref().ok_or(SearchError::Uninitialized)
    }

    fn tree_mut(&mut self) -> SearchResult<&mut DecisionTree> {
        self.tree.as_mut().ok_or(SearchError::Uninitialized)
    }

    /// Short unique node id drawn from the engine RNG.
    fn next_node_id(&mut self) -> String {
        loop {
            let id = format!("n{:08x}", self.rng.gen::<u32>());
            let taken = self.tree.as_ref().map_or(false, |tree| tree.contains(&id));
            if !taken {
                return id;
            }
        }
    }

    fn record_snapshot(&mut self) {
        let Some(tree) = self.tree.as_ref() else {
            return;
        };
        let snapshot = TreeSnapshot::capture(tree, self.selected_node_id.as_deref());
        self.watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        self.history.push(snapshot);
    }
}

/// Map a 1-10 content analysis onto a full [0,1] metrics update.
fn metrics_from_analysis(analysis: &ContentAnalysis) -> MetricsUpdate {
    MetricsUpdate {
        emotional_state: Some(f64::from(analysis.emotional_state) / SCORE_SCALE),
        instinct_weight: Some(f64::from(analysis.instinct_vs_analysis) / SCORE_SCALE),
        confidence: Some(f64::from(analysis.confidence) / SCORE_SCALE),
        perseverance: Some(f64::from(analysis.perseverance) / SCORE_SCALE),
    }
}

/// First contiguous digit run in `text`, if any.
fn parse_first_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Case-insensitive substring hit count over a fixed indicator list.
fn count_indicator_hits(lowered: &str, indicators: &[&str]) -> usize {
    indicators
        .iter()
        .map(|needle| lowered.matches(needle).count())
        .sum()
}

/// Whether content shows strictly more persistence than doubt language.
fn shows_perseverance(content: &str) -> bool {
    let lowered = content.to_lowercase();
    count_indicator_hits(&lowered, PERSEVERANCE_INDICATORS)
        > count_indicator_hits(&lowered, DOUBT_INDICATORS)
}
