// access-engine/src/domain/integrity.rs

use crate::domain::catalog::{PermissionCatalog, PermissionRecord};
use crate::domain::dependency_graph::{DependencyEdge, DependencyGraph, GraphIssue};
use crate::domain::ids::{PermissionId, RoleId};
use crate::domain::role_hierarchy::{RoleHierarchy, RoleRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// 直接付与の生の行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantRecord {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

/// 検証対象のシステム全体スナップショット
#[derive(Debug, Clone, Default)]
pub struct AccessSnapshot {
    pub permissions: Vec<PermissionRecord>,
    pub edges: Vec<DependencyEdge>,
    pub roles: Vec<RoleRecord>,
    pub grants: Vec<GrantRecord>,
}

/// 検出された不整合の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityIssueKind {
    CircularDependency,
    OrphanedDependencyEdge,
    DuplicatePermissionName,
    DuplicateRoleName,
    CircularRoleHierarchy,
    OrphanedGrant,
    ClosureViolation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub kind: IntegrityIssueKind,
    pub detail: String,
}

/// 整合性検証レポート
///
/// 検証自体は失敗しない。全てが不正でもレポートとして返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<IntegrityIssue>,
    pub total_issues: usize,
}

impl IntegrityReport {
    fn from_issues(issues: Vec<IntegrityIssue>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            total_issues: issues.len(),
            issues,
        }
    }
}

/// スナップショット全体の整合性を検証する
///
/// 直近の変更箇所に限らない全域の掃き出し。通常の変更経路を通って
/// いれば検出されないはずの不整合も、別経路でデータが書き換えられた
/// 場合に備えて全て拾う。
pub fn validate_snapshot(snapshot: &AccessSnapshot) -> IntegrityReport {
    let catalog = PermissionCatalog::from_records(snapshot.permissions.iter().cloned());
    let graph = DependencyGraph::from_parts(catalog.ids(), snapshot.edges.iter().copied());
    let hierarchy = RoleHierarchy::from_records(snapshot.roles.iter().cloned());

    let mut issues = Vec::new();

    collect_duplicate_names(snapshot, &catalog, &mut issues);
    collect_graph_issues(&graph, &catalog, &mut issues);
    collect_hierarchy_cycles(snapshot, &mut issues);
    collect_grant_issues(snapshot, &catalog, &graph, &hierarchy, &mut issues);

    IntegrityReport::from_issues(issues)
}

// 検証ステップ

fn collect_duplicate_names(
    snapshot: &AccessSnapshot,
    catalog: &PermissionCatalog,
    issues: &mut Vec<IntegrityIssue>,
) {
    for name in catalog.duplicate_names() {
        issues.push(IntegrityIssue {
            kind: IntegrityIssueKind::DuplicatePermissionName,
            detail: format!("permission name '{}' is used by multiple records", name),
        });
    }

    let mut seen: HashMap<&str, RoleId> = HashMap::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for role in &snapshot.roles {
        if let Some(existing) = seen.get(role.name.as_str()) {
            if *existing != role.id && reported.insert(role.name.as_str()) {
                issues.push(IntegrityIssue {
                    kind: IntegrityIssueKind::DuplicateRoleName,
                    detail: format!("role name '{}' is used by multiple records", role.name),
                });
            }
        } else {
            seen.insert(role.name.as_str(), role.id);
        }
    }
}

fn collect_graph_issues(
    graph: &DependencyGraph,
    catalog: &PermissionCatalog,
    issues: &mut Vec<IntegrityIssue>,
) {
    for issue in graph.validate_integrity() {
        match issue {
            GraphIssue::CircularDependency { cycle } => {
                let chain = cycle
                    .iter()
                    .map(|p| catalog.display_name_of(*p))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                issues.push(IntegrityIssue {
                    kind: IntegrityIssueKind::CircularDependency,
                    detail: format!("dependency cycle: {}", chain),
                });
            }
            GraphIssue::OrphanedEdge { edge } => {
                issues.push(IntegrityIssue {
                    kind: IntegrityIssueKind::OrphanedDependencyEdge,
                    detail: format!(
                        "dependency edge {} -> {} references a missing permission",
                        edge.permission_id, edge.depends_on_id
                    ),
                });
            }
        }
    }
}

fn collect_hierarchy_cycles(snapshot: &AccessSnapshot, issues: &mut Vec<IntegrityIssue>) {
    let parents: HashMap<RoleId, Option<RoleId>> = snapshot
        .roles
        .iter()
        .map(|r| (r.id, r.parent_id))
        .collect();
    let names: HashMap<RoleId, &str> = snapshot
        .roles
        .iter()
        .map(|r| (r.id, r.name.as_str()))
        .collect();

    // 閉路ごとに1回だけ報告するため、検出済みノードを記録する
    let mut in_reported_cycle: HashSet<RoleId> = HashSet::new();
    let mut cleared: HashSet<RoleId> = HashSet::new();

    let mut roots: Vec<RoleId> = parents.keys().copied().collect();
    roots.sort();

    for start in roots {
        if cleared.contains(&start) || in_reported_cycle.contains(&start) {
            continue;
        }

        let mut trail = Vec::new();
        let mut on_trail: HashSet<RoleId> = HashSet::new();
        let mut cursor = Some(start);

        while let Some(current) = cursor {
            if cleared.contains(&current) || in_reported_cycle.contains(&current) {
                break;
            }
            if on_trail.contains(&current) {
                // trail 上の current 以降が閉路
                let pos = trail.iter().position(|&r| r == current).unwrap_or(0);
                let cycle: Vec<RoleId> = trail[pos..].to_vec();
                let chain = cycle
                    .iter()
                    .chain(std::iter::once(&current))
                    .map(|r| names.get(r).map(|n| (*n).to_string()).unwrap_or_else(|| r.to_string()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                issues.push(IntegrityIssue {
                    kind: IntegrityIssueKind::CircularRoleHierarchy,
                    detail: format!("role hierarchy cycle: {}", chain),
                });
                in_reported_cycle.extend(cycle);
                break;
            }
            trail.push(current);
            on_trail.insert(current);
            cursor = parents.get(&current).copied().flatten();
        }

        for role in trail {
            if !in_reported_cycle.contains(&role) {
                cleared.insert(role);
            }
        }
    }
}

fn collect_grant_issues(
    snapshot: &AccessSnapshot,
    catalog: &PermissionCatalog,
    graph: &DependencyGraph,
    hierarchy: &RoleHierarchy,
    issues: &mut Vec<IntegrityIssue>,
) {
    let mut grants_by_role: HashMap<RoleId, HashSet<PermissionId>> = HashMap::new();

    for grant in &snapshot.grants {
        let role_known = hierarchy.contains(grant.role_id);
        let permission_known = catalog.contains(grant.permission_id);

        if !role_known || !permission_known {
            issues.push(IntegrityIssue {
                kind: IntegrityIssueKind::OrphanedGrant,
                detail: format!(
                    "grant ({}, {}) references a missing {}",
                    grant.role_id,
                    grant.permission_id,
                    if role_known { "permission" } else { "role" }
                ),
            });
            continue;
        }

        grants_by_role
            .entry(grant.role_id)
            .or_default()
            .insert(grant.permission_id);
    }

    // 閉包不変条件: 直接付与は依存について閉じていなければならない
    let mut role_ids: Vec<RoleId> = grants_by_role.keys().copied().collect();
    role_ids.sort();

    for role_id in role_ids {
        let granted = &grants_by_role[&role_id];
        let role_name = hierarchy
            .get(role_id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| role_id.to_string());

        let mut held: Vec<PermissionId> = granted.iter().copied().collect();
        held.sort();

        for permission in held {
            let mut missing: Vec<PermissionId> = graph
                .all_dependencies(permission)
                .into_iter()
                .filter(|dep| !granted.contains(dep))
                .collect();
            missing.sort();

            for dep in missing {
                issues.push(IntegrityIssue {
                    kind: IntegrityIssueKind::ClosureViolation,
                    detail: format!(
                        "role '{}' holds '{}' without its required dependency '{}'",
                        role_name,
                        catalog.display_name_of(permission),
                        catalog.display_name_of(dep)
                    ),
                });
            }
        }
    }
}
