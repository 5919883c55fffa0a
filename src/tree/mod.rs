//! Decision tree layer: arena-owned nodes, instinct metrics, and the
//! instinct-adjusted UCT selection score.
//!
//! The tree is an arena addressed by node id. Each node keeps a non-owning
//! back-reference to its parent and an ordered list of owned child ids, so
//! the arena is the single owner of every node and parent/child links can
//! never form an ownership cycle.

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

/// Small constant preventing division by zero and log(0) in the selection
/// score.
pub const SCORE_EPSILON: f64 = 1e-6;

/// Tunable coefficients for the selection score, fixed at engine
/// construction and copied into every node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionCoefficients {
    /// UCT exploration coefficient.
    pub exploration_weight: f64,
    /// Amplifies exploration by the node's emotional state.
    pub confidence_bias: f64,
    /// Flat selection bonus per unit of perseverance.
    pub perseverance_factor: f64,
}

impl Default for SelectionCoefficients {
    fn default() -> Self {
        Self {
            exploration_weight: 1.4,
            confidence_bias: 0.2,
            perseverance_factor: 0.7,
        }
    }
}

/// Instinct signals attached to a node, each held within [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstinctMetrics {
    /// Emotional valence; 0.5 is neutral.
    pub emotional_state: f64,
    /// 0 = purely analytical, 1 = purely instinctual.
    pub instinct_weight: f64,
    /// Certainty expressed by the node's content.
    pub confidence: f64,
    /// Commitment to continuing despite obstacles.
    pub perseverance: f64,
}

impl Default for InstinctMetrics {
    fn default() -> Self {
        Self {
            emotional_state: 0.5,
            instinct_weight: 0.5,
            confidence: 0.5,
            perseverance: 0.5,
        }
    }
}

/// Partial update for [`InstinctMetrics`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsUpdate {
    /// New emotional valence, if any.
    pub emotional_state: Option<f64>,
    /// New instinct weight, if any.
    pub instinct_weight: Option<f64>,
    /// New confidence, if any.
    pub confidence: Option<f64>,
    /// New perseverance, if any.
    pub perseverance: Option<f64>,
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

impl InstinctMetrics {
    /// Pure merge: apply the supplied fields of `update`, clamping each to
    /// [0,1], and return the new snapshot. No write path may bypass the
    /// clamp.
    pub fn merged(&self, update: &MetricsUpdate) -> Self {
        Self {
            emotional_state: update
                .emotional_state
                .map(clamp01)
                .unwrap_or(self.emotional_state),
            instinct_weight: update
                .instinct_weight
                .map(clamp01)
                .unwrap_or(self.instinct_weight),
            confidence: update.confidence.map(clamp01).unwrap_or(self.confidence),
            perseverance: update
                .perseverance
                .map(clamp01)
                .unwrap_or(self.perseverance),
        }
    }
}

/// One candidate approach in the search tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionNode {
    /// Short unique identifier, immutable after creation.
    pub id: String,
    /// Free-text approach sketch.
    pub content: String,
    /// Owning parent id; `None` only for the root.
    pub parent_id: Option<String>,
    /// Child ids in insertion order (exploration order).
    pub children: Vec<String>,
    /// Root = 0, children = parent depth + 1.
    pub depth: u32,
    /// Ancestor ids from the root, exclusive of self; length equals depth.
    pub path: Vec<String>,
    /// Number of backpropagation passes through this node.
    pub visits: u64,
    /// Sum of all backpropagated scores.
    pub value: f64,
    /// Instinct signals.
    pub metrics: InstinctMetrics,
    /// Selection coefficients inherited from the engine.
    pub coefficients: SelectionCoefficients,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When content or metrics last changed.
    pub updated_at: DateTime<Utc>,
}

impl DecisionNode {
    /// Create a root node
    pub fn root(
        id: impl Into<String>,
        content: impl Into<String>,
        coefficients: SelectionCoefficients,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            content: content.into(),
            parent_id: None,
            children: Vec::new(),
            depth: 0,
            path: Vec::new(),
            visits: 0,
            value: 0.0,
            metrics: InstinctMetrics::default(),
            coefficients,
            created_at: now,
            updated_at: now,
        }
    }

    fn child_of(parent: &DecisionNode, id: String, content: String) -> Self {
        let mut path = parent.path.clone();
        path.push(parent.id.clone());
        let now = Utc::now();
        Self {
            id,
            content,
            parent_id: Some(parent.id.clone()),
            children: Vec::new(),
            depth: parent.depth + 1,
            path,
            visits: 0,
            value: 0.0,
            metrics: InstinctMetrics::default(),
            coefficients: parent.coefficients,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this node is the root
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Selection score given the parent's visit count.
    ///
    /// UCT exploitation/exploration with two instinct adjustments: the
    /// exploration term is amplified by emotional confidence, and a flat
    /// perseverance bonus is added regardless of visit count. The root is
    /// never a selection candidate and always scores 0.
    pub fn score_against(&self, parent_visits: u64) -> f64 {
        if self.is_root() {
            return 0.0;
        }

        let visits = self.visits as f64 + SCORE_EPSILON;
        let exploitation = self.value / visits;
        let exploration = self.coefficients.exploration_weight
            * ((parent_visits as f64 + SCORE_EPSILON).ln() / visits).sqrt();
        let confidence_modifier = self.coefficients.confidence_bias * self.metrics.emotional_state;
        let perseverance_boost = self.metrics.perseverance * self.coefficients.perseverance_factor;

        exploitation + exploration * (1.0 + confidence_modifier) + perseverance_boost
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Arena-owned search tree.
///
/// The arena is the exclusive owner of all nodes; it is only ever mutated by
/// one engine instance (single-writer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: HashMap<String, DecisionNode>,
    root_id: String,
}

impl DecisionTree {
    /// Install `root` as the tree's root node
    pub fn new(root: DecisionNode) -> Self {
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self { nodes, root_id }
    }

    /// The root node's id
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// The root node
    pub fn root(&self) -> &DecisionNode {
        &self.nodes[&self.root_id]
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `id` names a node in this tree
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a node by id
    pub fn get(&self, id: &str) -> SearchResult<&DecisionNode> {
        self.nodes.get(id).ok_or_else(|| SearchError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    /// Look up a node by id, mutably
    pub fn get_mut(&mut self, id: &str) -> SearchResult<&mut DecisionNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| SearchError::NodeNotFound {
                node_id: id.to_string(),
            })
    }

    /// Create a child of `parent_id` inheriting its coefficients, append it
    /// to the parent's child list, and return it. Bumps the parent's
    /// `updated_at`.
    pub fn add_child(
        &mut self,
        parent_id: &str,
        id: impl Into<String>,
        content: impl Into<String>,
    ) -> SearchResult<&DecisionNode> {
        let id = id.into();
        let content = content.into();

        let child = {
            let parent = self.get_mut(parent_id)?;
            let child = DecisionNode::child_of(parent, id.clone(), content);
            parent.children.push(id.clone());
            parent.touch();
            child
        };

        self.nodes.insert(id.clone(), child);
        self.get(&id)
    }

    /// Merge a partial metrics update into a node, clamped to [0,1]
    pub fn update_metrics(&mut self, id: &str, update: &MetricsUpdate) -> SearchResult<()> {
        let node = self.get_mut(id)?;
        node.metrics = node.metrics.merged(update);
        node.touch();
        Ok(())
    }

    /// Replace a node's content
    pub fn update_content(&mut self, id: &str, content: impl Into<String>) -> SearchResult<()> {
        let node = self.get_mut(id)?;
        node.content = content.into();
        node.touch();
        Ok(())
    }

    /// Pre-order depth-first search for `id` starting at the root
    pub fn find_by_id(&self, id: &str) -> Option<&DecisionNode> {
        self.preorder().find(|node| node.id == id)
    }

    /// All nodes in deterministic pre-order (self, then children in
    /// insertion order)
    pub fn all_nodes(&self) -> Vec<&DecisionNode> {
        self.preorder().collect()
    }

    fn preorder(&self) -> impl Iterator<Item = &DecisionNode> {
        let mut stack = vec![self.root_id.as_str()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = self.nodes.get(id)?;
            // Reverse push so the first child is visited first.
            for child_id in node.children.iter().rev() {
                stack.push(child_id);
            }
            Some(node)
        })
    }

    /// Selection score for `id`; 0 for the root or an unknown id
    pub fn selection_score(&self, id: &str) -> f64 {
        let Some(node) = self.nodes.get(id) else {
            return 0.0;
        };
        let parent_visits = node
            .parent_id
            .as_ref()
            .and_then(|pid| self.nodes.get(pid))
            .map(|parent| parent.visits)
            .unwrap_or(0);
        node.score_against(parent_visits)
    }

    /// Reorder a node's children by descending instinct weight.
    ///
    /// Presentation/selection-priority order only; depth, path, and
    /// parentage are untouched.
    pub fn sort_children_by_instinct(&mut self, parent_id: &str) -> SearchResult<()> {
        let mut weighted: Vec<(String, f64)> = self
            .get(parent_id)?
            .children
            .iter()
            .map(|child_id| {
                let weight = self
                    .nodes
                    .get(child_id)
                    .map(|child| child.metrics.instinct_weight)
                    .unwrap_or(0.0);
                (child_id.clone(), weight)
            })
            .collect();

        // Stable sort: ties keep insertion order.
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1));

        let parent = self.get_mut(parent_id)?;
        parent.children = weighted.into_iter().map(|(id, _)| id).collect();
        Ok(())
    }

    /// Descend from the root always taking the child with strictly greatest
    /// visit count (first-encountered wins ties), stopping at a childless
    /// node. Visit count, not accumulated value, is the ranking statistic.
    pub fn most_visited_leaf(&self) -> &DecisionNode {
        let mut current = self.root();
        loop {
            let mut best: Option<&DecisionNode> = None;
            for child_id in &current.children {
                let Some(child) = self.nodes.get(child_id) else {
                    continue;
                };
                match best {
                    Some(leader) if child.visits <= leader.visits => {}
                    _ => best = Some(child),
                }
            }
            match best {
                Some(next) => current = next,
                None => return current,
            }
        }
    }
}
