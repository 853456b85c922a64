use super::*;
use crate::constants::UNCLUSTERED;
use crate::graph::GraphError;

fn groupings(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|g| g.iter().map(|s| s.to_string()).collect())
        .collect()
}

#[test]
fn test_build_clusters_assigns_position_ids() {
    let g = groupings(&[&["a", "b"], &["c"], &["d", "e", "f"]]);
    let clusters = build_clusters(&g);

    assert_eq!(clusters.cluster_of("a"), 0);
    assert_eq!(clusters.cluster_of("b"), 0);
    assert_eq!(clusters.cluster_of("c"), 1);
    assert_eq!(clusters.cluster_of("d"), 2);
    assert_eq!(clusters.cluster_of("f"), 2);
    assert_eq!(clusters.len(), 6);
    assert_eq!(clusters.nb_groupings(), 3);
}

#[test]
fn test_build_clusters_last_occurrence_wins() {
    let g = groupings(&[&["a", "b"], &["b", "c"], &["a"]]);
    let clusters = build_clusters(&g);

    assert_eq!(clusters.cluster_of("a"), 2);
    assert_eq!(clusters.cluster_of("b"), 1);
    assert_eq!(clusters.cluster_of("c"), 1);
    assert_eq!(clusters.len(), 3);
}

#[test]
fn test_build_clusters_unknown_line_is_unclustered() {
    let g = groupings(&[&["a"]]);
    let clusters = build_clusters(&g);

    assert_eq!(clusters.get("z"), None);
    assert_eq!(clusters.cluster_of("z"), UNCLUSTERED);
    assert!(!clusters.contains("z"));
}

#[test]
fn test_build_clusters_empty_input() {
    let g: Vec<Vec<String>> = vec![];
    let clusters = build_clusters(&g);

    assert!(clusters.is_empty());
    assert_eq!(clusters.nb_groupings(), 0);
}

#[test]
fn test_build_clusters_empty_grouping_still_consumes_id() {
    let g = groupings(&[&[], &["a"]]);
    let clusters = build_clusters(&g);

    assert_eq!(clusters.cluster_of("a"), 1);
    assert_eq!(clusters.nb_groupings(), 2);
}

#[test]
fn test_build_clusters_is_deterministic() {
    let g = groupings(&[&["x", "y"], &["z"], &["y"]]);
    assert_eq!(build_clusters(&g), build_clusters(&g));
}

#[test]
fn test_build_clusters_over_integer_ids() {
    let g = vec![vec![3usize, 1], vec![2]];
    let clusters = build_clusters(&g);

    assert_eq!(clusters.cluster_of(&3), 0);
    assert_eq!(clusters.cluster_of(&2), 1);
    assert_eq!(clusters.cluster_of(&7), UNCLUSTERED);
}

#[test]
fn test_labels_for_keeps_universe_order() {
    let g = groupings(&[&["a", "b"], &["c"]]);
    let clusters = build_clusters(&g);

    let labels = clusters.labels_for(["c", "a", "missing", "b"]);
    assert_eq!(labels, vec![1, 0, UNCLUSTERED, 0]);
}

#[test]
fn test_groupings_from_edges_connected_components() {
    let groups = groupings_from_edges(6, [(0, 1), (1, 2), (4, 3)]).unwrap();
    assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
}

#[test]
fn test_groupings_from_edges_no_edges_gives_singletons() {
    let groups = groupings_from_edges(3, []).unwrap();
    assert_eq!(groups, vec![vec![0], vec![1], vec![2]]);
}

#[test]
fn test_groupings_from_edges_order_independent() {
    let forward = groupings_from_edges(5, [(0, 4), (2, 3), (4, 2)]).unwrap();
    let backward = groupings_from_edges(5, [(2, 4), (3, 2), (4, 0)]).unwrap();
    assert_eq!(forward, backward);
    assert_eq!(forward, vec![vec![0, 2, 3, 4], vec![1]]);
}

#[test]
fn test_groupings_from_edges_self_loop_and_duplicates() {
    let groups = groupings_from_edges(3, [(1, 1), (0, 2), (2, 0), (0, 2)]).unwrap();
    assert_eq!(groups, vec![vec![0, 2], vec![1]]);
}

#[test]
fn test_groupings_from_edges_rejects_out_of_range() {
    let err = groupings_from_edges(2, [(0, 1), (1, 5)]).unwrap_err();
    match err {
        GraphError::NodeOutOfRange {
            edge,
            node,
            nb_nodes,
        } => {
            assert_eq!(edge, 1);
            assert_eq!(node, 5);
            assert_eq!(nb_nodes, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_groupings_feed_cluster_builder() {
    let groups = groupings_from_edges(4, [(0, 3)]).unwrap();
    let clusters = build_clusters(&groups);

    assert_eq!(clusters.cluster_of(&0), clusters.cluster_of(&3));
    assert_ne!(clusters.cluster_of(&1), clusters.cluster_of(&2));
}
