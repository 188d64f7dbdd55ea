// tests/dependency_graph_tests.rs

mod common;

use access_engine::domain::dependency_graph::{DependencyEdge, DependencyGraph, GraphIssue};
use access_engine::domain::ids::PermissionId;
use access_engine::AppError;
use common::permission;
use std::collections::HashSet;

fn graph_with(n: usize) -> (DependencyGraph, Vec<PermissionId>) {
    let records: Vec<_> = (0..n)
        .map(|i| permission(&format!("tasks.p{}", i), "tasks"))
        .collect();
    let ids: Vec<PermissionId> = records.iter().map(|r| r.id).collect();
    (
        DependencyGraph::from_parts(ids.iter().copied(), Vec::new()),
        ids,
    )
}

#[test]
fn test_added_edge_makes_reverse_direction_cyclic() {
    let (mut graph, p) = graph_with(2);

    graph.add_dependency(p[0], p[1]).unwrap();

    // a -> b の後、b -> a は常に閉路
    assert!(graph.would_create_cycle(p[1], p[0]));
}

#[test]
fn test_long_chain_cycle_rejected() {
    let (mut graph, p) = graph_with(5);
    for window in p.windows(2) {
        graph.add_dependency(window[0], window[1]).unwrap();
    }

    let err = graph.add_dependency(p[4], p[0]).unwrap_err();
    assert!(matches!(err, AppError::CircularDependency(_)));

    // 失敗した変更は観測可能な影響を残さない
    assert_eq!(graph.edge_count(), 4);
    assert!(graph.all_dependents(p[0]).is_empty());
}

#[test]
fn test_diamond_dependencies_resolve_once() {
    let (mut graph, p) = graph_with(4);
    graph.add_dependency(p[0], p[1]).unwrap();
    graph.add_dependency(p[0], p[2]).unwrap();
    graph.add_dependency(p[1], p[3]).unwrap();
    graph.add_dependency(p[2], p[3]).unwrap();

    assert_eq!(
        graph.all_dependencies(p[0]),
        HashSet::from([p[1], p[2], p[3]])
    );
    // 逆方向も対称に解決できる
    assert_eq!(
        graph.all_dependents(p[3]),
        HashSet::from([p[0], p[1], p[2]])
    );
}

#[test]
fn test_direct_neighbors_are_single_hop() {
    let (mut graph, p) = graph_with(3);
    graph.add_dependency(p[0], p[1]).unwrap();
    graph.add_dependency(p[1], p[2]).unwrap();

    assert_eq!(graph.direct_dependencies(p[0]), HashSet::from([p[1]]));
    assert_eq!(graph.direct_dependents(p[2]), HashSet::from([p[1]]));
}

#[test]
fn test_find_path_for_diagnostics() {
    let (mut graph, p) = graph_with(4);
    graph.add_dependency(p[0], p[1]).unwrap();
    graph.add_dependency(p[1], p[2]).unwrap();

    assert_eq!(graph.find_path(p[0], p[2]), vec![p[0], p[1], p[2]]);
    // 到達不能なら空
    assert!(graph.find_path(p[0], p[3]).is_empty());
    assert!(graph.find_path(p[2], p[0]).is_empty());
}

#[test]
fn test_validate_integrity_does_not_mutate() {
    let ids: Vec<PermissionId> = (0..2).map(|_| PermissionId::new()).collect();
    let orphan = PermissionId::new();
    let graph = DependencyGraph::from_parts(
        ids.iter().copied(),
        vec![
            DependencyEdge {
                permission_id: ids[0],
                depends_on_id: ids[1],
            },
            DependencyEdge {
                permission_id: ids[1],
                depends_on_id: orphan,
            },
        ],
    );

    let first = graph.validate_integrity();
    let second = graph.validate_integrity();

    assert_eq!(first, second);
    assert_eq!(graph.edge_count(), 2);
    assert!(first
        .iter()
        .any(|i| matches!(i, GraphIssue::OrphanedEdge { .. })));
}

#[test]
fn test_cleanup_then_validate_is_clean() {
    let ids: Vec<PermissionId> = (0..2).map(|_| PermissionId::new()).collect();
    let orphan = PermissionId::new();
    let mut graph = DependencyGraph::from_parts(
        ids.iter().copied(),
        vec![
            DependencyEdge {
                permission_id: ids[0],
                depends_on_id: ids[1],
            },
            DependencyEdge {
                permission_id: orphan,
                depends_on_id: ids[0],
            },
        ],
    );

    assert_eq!(graph.cleanup_invalid_edges(), 1);
    assert!(graph.validate_integrity().is_empty());
}
