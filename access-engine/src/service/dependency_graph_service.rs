// access-engine/src/service/dependency_graph_service.rs

use crate::domain::catalog::PermissionCatalog;
use crate::domain::dependency_graph::{DependencyGraph, GraphIssue};
use crate::domain::ids::PermissionId;
use crate::error::{AppError, AppResult};
use crate::repository::dependency_repository::DependencyRepository;
use crate::service::load_graph;
use crate::utils::cache::{dependency_closure_key, dependent_closure_key, ClosureCache};
use crate::utils::transaction::{acquire_graph_lock, GraphLockDomain, TransactionManager};
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// 権限依存グラフの管理サービス
///
/// 変更系はチェックと書き込みを同一トランザクション内で行い、
/// 依存グラフのロックドメインで直列化する。読み取り系は閉包
/// キャッシュを使うが、閉路チェックには一切使わない。
pub struct DependencyGraphService {
    db: Arc<DatabaseConnection>,
    cache: Arc<dyn ClosureCache>,
}

impl DependencyGraphService {
    pub fn new(db: Arc<DatabaseConnection>, cache: Arc<dyn ClosureCache>) -> Self {
        Self { db, cache }
    }

    /// `from -> to` の依存を追加する
    ///
    /// 閉路を生む場合は `CircularDependency`。既存エッジの再追加は
    /// 何もせず `Ok(false)`。
    pub async fn add_dependency(&self, from: PermissionId, to: PermissionId) -> AppResult<bool> {
        let cache = Arc::clone(&self.cache);

        let inserted = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    acquire_graph_lock(txn, GraphLockDomain::DependencyGraph).await?;

                    let (catalog, graph) = load_graph(txn).await?;
                    catalog.require(from)?;
                    catalog.require(to)?;

                    if graph.would_create_cycle(from, to) {
                        return Err(AppError::CircularDependency(cycle_detail(
                            &catalog, &graph, from, to,
                        )));
                    }
                    if graph.has_edge(from, to) {
                        return Ok(false);
                    }

                    DependencyRepository::insert(txn, from, to).await?;
                    // コミット前に閉包キャッシュを破棄する
                    cache.invalidate_all();
                    Ok(true)
                })
            })
            .await?;

        if inserted {
            info!(from = %from, to = %to, "Added permission dependency");
        }
        Ok(inserted)
    }

    /// `from -> to` の依存を削除する(存在しなくても成功)
    pub async fn remove_dependency(&self, from: PermissionId, to: PermissionId) -> AppResult<bool> {
        let cache = Arc::clone(&self.cache);

        let removed = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    acquire_graph_lock(txn, GraphLockDomain::DependencyGraph).await?;

                    let deleted = DependencyRepository::delete(txn, from, to).await?;
                    if deleted > 0 {
                        cache.invalidate_all();
                    }
                    Ok(deleted > 0)
                })
            })
            .await?;

        if removed {
            info!(from = %from, to = %to, "Removed permission dependency");
        }
        Ok(removed)
    }

    /// エッジ追加が閉路を生むかの事前チェック(キャッシュ不使用)
    pub async fn would_create_cycle(
        &self,
        from: PermissionId,
        to: PermissionId,
    ) -> AppResult<bool> {
        let (catalog, graph) = load_graph(self.db.as_ref()).await?;
        catalog.require(from)?;
        catalog.require(to)?;
        Ok(graph.would_create_cycle(from, to))
    }

    /// 直接依存(1ホップ)
    pub async fn direct_dependencies(
        &self,
        permission: PermissionId,
    ) -> AppResult<HashSet<PermissionId>> {
        let (catalog, graph) = load_graph(self.db.as_ref()).await?;
        catalog.require(permission)?;
        Ok(graph.direct_dependencies(permission))
    }

    /// 直接被依存(1ホップ)
    pub async fn direct_dependents(
        &self,
        permission: PermissionId,
    ) -> AppResult<HashSet<PermissionId>> {
        let (catalog, graph) = load_graph(self.db.as_ref()).await?;
        catalog.require(permission)?;
        Ok(graph.direct_dependents(permission))
    }

    /// 推移的な依存の全体(メモ化あり)
    pub async fn all_dependencies(
        &self,
        permission: PermissionId,
    ) -> AppResult<HashSet<PermissionId>> {
        let key = dependency_closure_key(permission);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let (catalog, graph) = load_graph(self.db.as_ref()).await?;
        catalog.require(permission)?;
        let closure = graph.all_dependencies(permission);
        self.cache.put(&key, closure.clone());
        Ok(closure)
    }

    /// 推移的な被依存の全体(メモ化あり)
    pub async fn all_dependents(
        &self,
        permission: PermissionId,
    ) -> AppResult<HashSet<PermissionId>> {
        let key = dependent_closure_key(permission);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let (catalog, graph) = load_graph(self.db.as_ref()).await?;
        catalog.require(permission)?;
        let closure = graph.all_dependents(permission);
        self.cache.put(&key, closure.clone());
        Ok(closure)
    }

    /// `from` から `to` へ至る依存エッジの最短経路(診断用)
    pub async fn find_path(
        &self,
        from: PermissionId,
        to: PermissionId,
    ) -> AppResult<Vec<PermissionId>> {
        let (catalog, graph) = load_graph(self.db.as_ref()).await?;
        catalog.require(from)?;
        catalog.require(to)?;
        Ok(graph.find_path(from, to))
    }

    /// 依存グラフ単体の整合性検証(状態は変更しない)
    pub async fn validate_integrity(&self) -> AppResult<Vec<GraphIssue>> {
        let (_, graph) = load_graph(self.db.as_ref()).await?;
        Ok(graph.validate_integrity())
    }

    /// 孤児エッジを削除し、削除数を返す
    ///
    /// 端点の揃ったエッジは閉路の一部であっても削除しない。
    pub async fn cleanup_invalid_edges(&self) -> AppResult<u64> {
        let cache = Arc::clone(&self.cache);

        let removed = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    acquire_graph_lock(txn, GraphLockDomain::DependencyGraph).await?;

                    let (_, graph) = load_graph(txn).await?;
                    let mut removed = 0u64;
                    for edge in graph.invalid_edges() {
                        removed +=
                            DependencyRepository::delete(txn, edge.permission_id, edge.depends_on_id)
                                .await?;
                    }
                    if removed > 0 {
                        cache.invalidate_all();
                    }
                    Ok(removed)
                })
            })
            .await?;

        if removed > 0 {
            info!(count = removed, "Removed orphaned dependency edges");
        }
        Ok(removed)
    }
}

// ヘルパーメソッド

fn cycle_detail(
    catalog: &PermissionCatalog,
    graph: &DependencyGraph,
    from: PermissionId,
    to: PermissionId,
) -> String {
    if from == to {
        return format!(
            "permission '{}' cannot depend on itself",
            catalog.display_name_of(from)
        );
    }

    let chain = graph
        .find_path(to, from)
        .iter()
        .map(|p| catalog.display_name_of(*p))
        .collect::<Vec<_>>()
        .join(" -> ");
    format!(
        "'{}' already requires '{}' ({})",
        catalog.display_name_of(to),
        catalog.display_name_of(from),
        chain
    )
}
