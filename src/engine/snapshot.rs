//! Read-only tree snapshots for history and external rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::{DecisionNode, DecisionTree};

/// Fully-materialized copy of one node and its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node id.
    pub id: String,
    /// Approach text.
    pub content: String,
    /// Visit count.
    pub visits: u64,
    /// Accumulated value.
    pub value: f64,
    /// Emotional valence in [0,1].
    pub emotional_state: f64,
    /// Instinct weight in [0,1].
    pub instinct_weight: f64,
    /// Confidence in [0,1].
    pub confidence: f64,
    /// Perseverance in [0,1].
    pub perseverance: f64,
    /// Child snapshots in the node's current child order.
    pub children: Vec<NodeSnapshot>,
}

/// Snapshot of the whole tree at one point in the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    /// The engine's selected node at capture time.
    pub selected_node_id: Option<String>,
    /// The root of the materialized tree.
    pub root: NodeSnapshot,
}

impl NodeSnapshot {
    fn from_node(tree: &DecisionTree, node: &DecisionNode) -> Self {
        let children = node
            .children
            .iter()
            .filter_map(|child_id| tree.get(child_id).ok())
            .map(|child| Self::from_node(tree, child))
            .collect();

        Self {
            id: node.id.clone(),
            content: node.content.clone(),
            visits: node.visits,
            value: node.value,
            emotional_state: node.metrics.emotional_state,
            instinct_weight: node.metrics.instinct_weight,
            confidence: node.metrics.confidence,
            perseverance: node.metrics.perseverance,
            children,
        }
    }

    /// Pre-order search of the snapshot subtree for `id`
    pub fn find(&self, id: &str) -> Option<&NodeSnapshot> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of nodes in this subtree, self included
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(NodeSnapshot::node_count)
            .sum::<usize>()
    }
}

impl TreeSnapshot {
    /// Materialize the live tree into a read-only snapshot
    pub fn capture(tree: &DecisionTree, selected_node_id: Option<&str>) -> Self {
        Self {
            captured_at: Utc::now(),
            selected_node_id: selected_node_id.map(str::to_string),
            root: NodeSnapshot::from_node(tree, tree.root()),
        }
    }

    /// Find a node snapshot by id
    pub fn find(&self, id: &str) -> Option<&NodeSnapshot> {
        self.root.find(id)
    }

    /// Total number of nodes captured
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}
