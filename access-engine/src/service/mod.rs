// src/service/mod.rs
pub mod assignment_service;
pub mod audit;
pub mod dependency_graph_service;
pub mod integrity_service;
pub mod role_hierarchy_service;

use crate::domain::assignment::DirectGrantMap;
use crate::domain::catalog::PermissionCatalog;
use crate::domain::dependency_graph::DependencyGraph;
use crate::domain::ids::{PermissionId, RoleId};
use crate::domain::role_hierarchy::RoleHierarchy;
use crate::error::AppResult;
use crate::repository::dependency_repository::DependencyRepository;
use crate::repository::permission_repository::PermissionRepository;
use crate::repository::role_permission_repository::RolePermissionRepository;
use crate::repository::role_repository::RoleRepository;
use sea_orm::ConnectionTrait;

// 共通ローダー
//
// 操作ごとに永続層から一括ロードし、メモリ上の隣接表現に展開する。
// トランザクション内からも接続からも同じコードで使えるよう、
// 接続型はジェネリックにしている。

pub(crate) async fn load_catalog<C: ConnectionTrait>(db: &C) -> AppResult<PermissionCatalog> {
    let models = PermissionRepository::find_all(db).await?;
    Ok(PermissionCatalog::from_records(
        models.iter().map(|m| m.to_record()),
    ))
}

pub(crate) async fn load_graph<C: ConnectionTrait>(
    db: &C,
) -> AppResult<(PermissionCatalog, DependencyGraph)> {
    let catalog = load_catalog(db).await?;
    let edges = DependencyRepository::find_all(db).await?;
    let graph = DependencyGraph::from_parts(catalog.ids(), edges.iter().map(|m| m.to_edge()));
    Ok((catalog, graph))
}

pub(crate) async fn load_hierarchy<C: ConnectionTrait>(db: &C) -> AppResult<RoleHierarchy> {
    let models = RoleRepository::find_all(db).await?;
    Ok(RoleHierarchy::from_records(
        models.iter().map(|m| m.to_record()),
    ))
}

pub(crate) async fn load_grants<C: ConnectionTrait>(db: &C) -> AppResult<DirectGrantMap> {
    let models = RolePermissionRepository::find_all(db).await?;
    let mut grants = DirectGrantMap::new();
    for model in models {
        grants
            .entry(RoleId(model.role_id))
            .or_default()
            .insert(PermissionId(model.permission_id));
    }
    Ok(grants)
}
