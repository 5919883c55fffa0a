//! Unit tests for the decision tree layer.

use super::*;
use pretty_assertions::assert_eq;

fn coefficients(exploration: f64, confidence_bias: f64, perseverance_factor: f64) -> SelectionCoefficients {
    SelectionCoefficients {
        exploration_weight: exploration,
        confidence_bias,
        perseverance_factor,
    }
}

fn small_tree() -> DecisionTree {
    let root = DecisionNode::root("root", "start here", SelectionCoefficients::default());
    DecisionTree::new(root)
}

// ============================================================================
// InstinctMetrics
// ============================================================================

#[test]
fn test_metrics_default_is_neutral() {
    let metrics = InstinctMetrics::default();
    assert_eq!(metrics.emotional_state, 0.5);
    assert_eq!(metrics.instinct_weight, 0.5);
    assert_eq!(metrics.confidence, 0.5);
    assert_eq!(metrics.perseverance, 0.5);
}

#[test]
fn test_merged_applies_only_supplied_fields() {
    let metrics = InstinctMetrics::default();
    let update = MetricsUpdate {
        confidence: Some(0.9),
        ..MetricsUpdate::default()
    };
    let merged = metrics.merged(&update);
    assert_eq!(merged.confidence, 0.9);
    assert_eq!(merged.emotional_state, 0.5);
    assert_eq!(merged.instinct_weight, 0.5);
    assert_eq!(merged.perseverance, 0.5);
}

#[test]
fn test_merged_clamps_out_of_range_inputs() {
    let metrics = InstinctMetrics::default();
    let update = MetricsUpdate {
        emotional_state: Some(3.7),
        instinct_weight: Some(-1.0),
        confidence: Some(1.0001),
        perseverance: Some(f64::NEG_INFINITY),
    };
    let merged = metrics.merged(&update);
    assert_eq!(merged.emotional_state, 1.0);
    assert_eq!(merged.instinct_weight, 0.0);
    assert_eq!(merged.confidence, 1.0);
    assert_eq!(merged.perseverance, 0.0);
}

#[test]
fn test_merged_is_pure() {
    let metrics = InstinctMetrics::default();
    let update = MetricsUpdate {
        perseverance: Some(0.8),
        ..MetricsUpdate::default()
    };
    let _ = metrics.merged(&update);
    // The original snapshot is untouched.
    assert_eq!(metrics.perseverance, 0.5);
}

// ============================================================================
// Structure: depth, path, children
// ============================================================================

#[test]
fn test_root_shape() {
    let tree = small_tree();
    let root = tree.root();
    assert!(root.is_root());
    assert_eq!(root.depth, 0);
    assert!(root.path.is_empty());
    assert!(root.parent_id.is_none());
    assert_eq!(root.visits, 0);
    assert_eq!(root.value, 0.0);
}

#[test]
fn test_add_child_sets_depth_and_path() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "first").unwrap();
    tree.add_child("a", "a1", "deeper").unwrap();
    tree.add_child("a1", "a2", "deepest").unwrap();

    let a2 = tree.get("a2").unwrap();
    assert_eq!(a2.depth, 3);
    assert_eq!(a2.path, vec!["root", "a", "a1"]);
    assert_eq!(a2.path.len() as u32, a2.depth);
}

#[test]
fn test_depth_path_invariant_under_arbitrary_growth() {
    let mut tree = small_tree();
    // Grow in a deliberately scattered order.
    tree.add_child("root", "x", "x").unwrap();
    tree.add_child("root", "y", "y").unwrap();
    tree.add_child("x", "x1", "x1").unwrap();
    tree.add_child("y", "y1", "y1").unwrap();
    tree.add_child("x1", "x2", "x2").unwrap();
    tree.add_child("root", "z", "z").unwrap();

    for node in tree.all_nodes() {
        if let Some(parent_id) = &node.parent_id {
            let parent = tree.get(parent_id).unwrap();
            assert_eq!(node.depth, parent.depth + 1);
            let mut expected = parent.path.clone();
            expected.push(parent.id.clone());
            assert_eq!(node.path, expected);
        }
    }
}

#[test]
fn test_children_keep_insertion_order() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("root", "b", "b").unwrap();
    tree.add_child("root", "c", "c").unwrap();
    assert_eq!(tree.root().children, vec!["a", "b", "c"]);
}

#[test]
fn test_child_inherits_coefficients() {
    let root = DecisionNode::root("root", "start", coefficients(2.0, 0.3, 0.9));
    let mut tree = DecisionTree::new(root);
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("a", "a1", "a1").unwrap();

    let a1 = tree.get("a1").unwrap();
    assert_eq!(a1.coefficients.exploration_weight, 2.0);
    assert_eq!(a1.coefficients.confidence_bias, 0.3);
    assert_eq!(a1.coefficients.perseverance_factor, 0.9);
}

#[test]
fn test_add_child_unknown_parent_fails() {
    let mut tree = small_tree();
    let err = tree.add_child("ghost", "a", "a").unwrap_err();
    assert!(matches!(err, SearchError::NodeNotFound { .. }));
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn test_add_child_bumps_parent_updated_at() {
    let mut tree = small_tree();
    let before = tree.root().updated_at;
    tree.add_child("root", "a", "a").unwrap();
    assert!(tree.root().updated_at >= before);
    assert_eq!(tree.root().children.len(), 1);
}

// ============================================================================
// Content and metric mutation
// ============================================================================

#[test]
fn test_update_content_replaces_text() {
    let mut tree = small_tree();
    tree.update_content("root", "revised approach").unwrap();
    assert_eq!(tree.root().content, "revised approach");
}

#[test]
fn test_update_metrics_through_tree_clamps() {
    let mut tree = small_tree();
    let update = MetricsUpdate {
        emotional_state: Some(42.0),
        ..MetricsUpdate::default()
    };
    tree.update_metrics("root", &update).unwrap();
    assert_eq!(tree.root().metrics.emotional_state, 1.0);
}

#[test]
fn test_update_metrics_unknown_node_fails() {
    let mut tree = small_tree();
    let err = tree
        .update_metrics("ghost", &MetricsUpdate::default())
        .unwrap_err();
    assert!(matches!(err, SearchError::NodeNotFound { .. }));
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_all_nodes_is_preorder() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("root", "b", "b").unwrap();
    tree.add_child("a", "a1", "a1").unwrap();
    tree.add_child("a", "a2", "a2").unwrap();

    let order: Vec<&str> = tree.all_nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(order, vec!["root", "a", "a1", "a2", "b"]);
}

#[test]
fn test_find_by_id_reaches_deep_nodes() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("a", "a1", "a1").unwrap();
    tree.add_child("a1", "a2", "target").unwrap();

    let found = tree.find_by_id("a2").unwrap();
    assert_eq!(found.content, "target");
    assert!(tree.find_by_id("missing").is_none());
}

// ============================================================================
// Selection score
// ============================================================================

#[test]
fn test_root_selection_score_is_zero_regardless_of_stats() {
    let mut tree = small_tree();
    {
        let root = tree.get_mut("root").unwrap();
        root.visits = 100;
        root.value = 500.0;
        root.metrics.perseverance = 1.0;
    }
    assert_eq!(tree.selection_score("root"), 0.0);
}

#[test]
fn test_selection_score_unknown_id_is_zero() {
    let tree = small_tree();
    assert_eq!(tree.selection_score("ghost"), 0.0);
}

#[test]
fn test_selection_score_matches_formula() {
    let root = DecisionNode::root("root", "start", coefficients(1.0, 0.0, 0.0));
    let mut tree = DecisionTree::new(root);
    tree.add_child("root", "a", "a").unwrap();
    {
        let root = tree.get_mut("root").unwrap();
        root.visits = 8;
    }
    {
        let a = tree.get_mut("a").unwrap();
        a.visits = 2;
        a.value = 6.0;
        // Zero coefficients mean the metrics cannot contribute here.
    }

    // exploitation = 6/2, exploration = sqrt(ln(8)/2)
    let expected = 3.0 + (8.0_f64.ln() / 2.0).sqrt();
    assert!((tree.selection_score("a") - expected).abs() < 1e-3);
}

#[test]
fn test_emotional_state_amplifies_exploration() {
    let root = DecisionNode::root("root", "start", coefficients(1.0, 1.0, 0.0));
    let mut tree = DecisionTree::new(root);
    tree.add_child("root", "a", "a").unwrap();
    tree.get_mut("root").unwrap().visits = 10;

    tree.get_mut("a").unwrap().metrics.emotional_state = 0.0;
    let flat = tree.selection_score("a");

    tree.get_mut("a").unwrap().metrics.emotional_state = 1.0;
    let amplified = tree.selection_score("a");

    assert!(amplified > flat);
}

#[test]
fn test_perseverance_adds_flat_boost() {
    let root = DecisionNode::root("root", "start", coefficients(1.0, 0.0, 0.7));
    let mut tree = DecisionTree::new(root);
    tree.add_child("root", "a", "a").unwrap();
    tree.get_mut("root").unwrap().visits = 10;

    tree.get_mut("a").unwrap().metrics.perseverance = 0.0;
    let without = tree.selection_score("a");

    tree.get_mut("a").unwrap().metrics.perseverance = 1.0;
    let with = tree.selection_score("a");

    assert!((with - without - 0.7).abs() < 1e-9);
}

// ============================================================================
// Child ordering and best-leaf extraction
// ============================================================================

#[test]
fn test_sort_children_by_instinct_descending() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("root", "b", "b").unwrap();
    tree.add_child("root", "c", "c").unwrap();
    tree.get_mut("a").unwrap().metrics.instinct_weight = 0.2;
    tree.get_mut("b").unwrap().metrics.instinct_weight = 0.9;
    tree.get_mut("c").unwrap().metrics.instinct_weight = 0.5;

    tree.sort_children_by_instinct("root").unwrap();
    assert_eq!(tree.root().children, vec!["b", "c", "a"]);
}

#[test]
fn test_sort_children_ties_keep_insertion_order() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("root", "b", "b").unwrap();
    // Both keep the default 0.5 instinct weight.
    tree.sort_children_by_instinct("root").unwrap();
    assert_eq!(tree.root().children, vec!["a", "b"]);
}

#[test]
fn test_most_visited_leaf_picks_greatest_visits() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("root", "b", "b").unwrap();
    tree.add_child("root", "c", "c").unwrap();
    tree.get_mut("a").unwrap().visits = 5;
    tree.get_mut("b").unwrap().visits = 2;
    tree.get_mut("c").unwrap().visits = 9;
    // Value must not influence the choice.
    tree.get_mut("a").unwrap().value = 1000.0;

    assert_eq!(tree.most_visited_leaf().id, "c");
}

#[test]
fn test_most_visited_leaf_descends_to_childless_node() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("a", "a1", "a1").unwrap();
    tree.add_child("a", "a2", "a2").unwrap();
    tree.get_mut("a").unwrap().visits = 4;
    tree.get_mut("a1").unwrap().visits = 1;
    tree.get_mut("a2").unwrap().visits = 3;

    assert_eq!(tree.most_visited_leaf().id, "a2");
}

#[test]
fn test_most_visited_leaf_on_bare_root() {
    let tree = small_tree();
    assert_eq!(tree.most_visited_leaf().id, "root");
}

#[test]
fn test_most_visited_leaf_tie_takes_first_encountered() {
    let mut tree = small_tree();
    tree.add_child("root", "a", "a").unwrap();
    tree.add_child("root", "b", "b").unwrap();
    tree.get_mut("a").unwrap().visits = 3;
    tree.get_mut("b").unwrap().visits = 3;

    assert_eq!(tree.most_visited_leaf().id, "a");
}
