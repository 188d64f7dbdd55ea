// access-engine/src/service/assignment_service.rs

use crate::domain::assignment::{AssignmentResolver, CascadeChange, DirectGrantMap};
use crate::domain::catalog::PermissionCatalog;
use crate::domain::dependency_graph::DependencyGraph;
use crate::domain::ids::{PermissionId, RoleId};
use crate::domain::role_hierarchy::RoleHierarchy;
use crate::error::{AppError, AppResult, DeletionBlockReason};
use crate::repository::role_permission_repository::RolePermissionRepository;
use crate::service::audit::CascadeNotifier;
use crate::service::{load_grants, load_graph, load_hierarchy};
use crate::utils::cache::{effective_permissions_key, ClosureCache};
use crate::utils::transaction::{acquire_graph_lock, GraphLockDomain, TransactionManager};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 付与解決サービス
///
/// 実効権限の計算と、カスケード整合な付与/剥奪を担う。カスケードは
/// 依存閉包を読むため、依存グラフのロックドメインで直列化する。
/// 継承は常に再計算であり、祖先・子孫の直接付与には触れない。
pub struct AssignmentService {
    db: Arc<DatabaseConnection>,
    cache: Arc<dyn ClosureCache>,
    notifier: Arc<dyn CascadeNotifier>,
}

impl AssignmentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cache: Arc<dyn ClosureCache>,
        notifier: Arc<dyn CascadeNotifier>,
    ) -> Self {
        Self {
            db,
            cache,
            notifier,
        }
    }

    /// ロールの実効権限集合(メモ化あり)
    pub async fn effective_permissions(&self, role: RoleId) -> AppResult<HashSet<PermissionId>> {
        let key = effective_permissions_key(role);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let (catalog, graph, hierarchy, grants) = load_world(self.db.as_ref()).await?;
        let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
        let effective = resolver.effective_permissions(role)?;

        self.cache.put(&key, effective.clone());
        Ok(effective)
    }

    /// 権限を付与する
    ///
    /// 対象の依存閉包のうち未付与のものも同時に直接付与へ追加する。
    /// すでに実効権限に含まれる場合は何もせず成功する。
    pub async fn grant(
        &self,
        role: RoleId,
        permission: PermissionId,
        granted_by: Option<Uuid>,
    ) -> AppResult<CascadeChange> {
        let cache = Arc::clone(&self.cache);

        let change = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    acquire_graph_lock(txn, GraphLockDomain::DependencyGraph).await?;

                    let (catalog, graph, hierarchy, grants) = load_world(txn).await?;
                    if !hierarchy.is_active(role) {
                        warn!(role = %role, "Granting to an inactive role");
                    }

                    let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
                    let change = resolver.plan_grant(role, permission)?;

                    if !change.granted.is_empty() {
                        RolePermissionRepository::insert_many(
                            txn,
                            role,
                            &change.granted,
                            granted_by,
                        )
                        .await?;
                        invalidate_effective(cache.as_ref(), &hierarchy, role);
                    }
                    Ok(change)
                })
            })
            .await?;

        if !change.is_empty() {
            self.notifier.cascade_applied(&change).await;
        }
        Ok(change)
    }

    /// 権限を剥奪する
    ///
    /// 対象を(推移的に)必要とする直接付与も全て外し、不動点まで
    /// 適用する。直接付与されていない権限の剥奪は何もしない。
    pub async fn revoke(&self, role: RoleId, permission: PermissionId) -> AppResult<CascadeChange> {
        let cache = Arc::clone(&self.cache);

        let change = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    acquire_graph_lock(txn, GraphLockDomain::DependencyGraph).await?;

                    let (catalog, graph, hierarchy, grants) = load_world(txn).await?;
                    let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
                    let change = resolver.plan_revoke(role, permission)?;

                    if !change.revoked.is_empty() {
                        RolePermissionRepository::delete_many(txn, role, &change.revoked).await?;
                        invalidate_effective(cache.as_ref(), &hierarchy, role);
                    }
                    Ok(change)
                })
            })
            .await?;

        if !change.is_empty() {
            self.notifier.cascade_applied(&change).await;
        }
        Ok(change)
    }

    /// 権限が削除可能か
    pub async fn can_delete_permission(&self, permission: PermissionId) -> AppResult<bool> {
        Ok(self
            .deletion_blocking_reasons(permission)
            .await?
            .is_empty())
    }

    /// 削除可能でなければ `DeletionBlocked` で失敗する
    ///
    /// CRUD層が削除をコミットする前の検証用。理由は全件まとめて返す。
    pub async fn ensure_deletable(&self, permission: PermissionId) -> AppResult<()> {
        let reasons = self.deletion_blocking_reasons(permission).await?;
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(AppError::DeletionBlocked(reasons))
        }
    }

    /// 権限削除のブロック理由を全て列挙する
    pub async fn deletion_blocking_reasons(
        &self,
        permission: PermissionId,
    ) -> AppResult<Vec<DeletionBlockReason>> {
        let (catalog, graph, hierarchy, grants) = load_world(self.db.as_ref()).await?;
        let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
        resolver.deletion_blocking_reasons(permission)
    }

    /// 指定した名前の権限を全て実効保持しているか
    pub async fn has_all_permissions(&self, role: RoleId, names: &[&str]) -> AppResult<bool> {
        let (catalog, graph, hierarchy, grants) = load_world(self.db.as_ref()).await?;
        let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
        resolver.has_all_permissions(role, names)
    }

    /// 指定した名前の権限をいずれか実効保持しているか
    pub async fn has_any_permission(&self, role: RoleId, names: &[&str]) -> AppResult<bool> {
        let (catalog, graph, hierarchy, grants) = load_world(self.db.as_ref()).await?;
        let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
        resolver.has_any_permission(role, names)
    }
}

// ヘルパーメソッド

async fn load_world<C: ConnectionTrait>(
    db: &C,
) -> AppResult<(
    PermissionCatalog,
    DependencyGraph,
    RoleHierarchy,
    DirectGrantMap,
)> {
    let (catalog, graph) = load_graph(db).await?;
    let hierarchy = load_hierarchy(db).await?;
    let grants = load_grants(db).await?;
    Ok((catalog, graph, hierarchy, grants))
}

/// 実効権限キャッシュの破棄
///
/// ロールの付与変更は自分と全子孫の実効権限に影響する。
fn invalidate_effective(cache: &dyn ClosureCache, hierarchy: &RoleHierarchy, role: RoleId) {
    cache.invalidate(&effective_permissions_key(role));
    for descendant in hierarchy.descendants(role) {
        cache.invalidate(&effective_permissions_key(descendant));
    }
}
