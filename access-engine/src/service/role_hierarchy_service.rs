// access-engine/src/service/role_hierarchy_service.rs

use crate::domain::ids::RoleId;
use crate::domain::role_hierarchy::{RoleHierarchy, RoleRecord};
use crate::error::{AppError, AppResult};
use crate::repository::role_repository::RoleRepository;
use crate::service::load_hierarchy;
use crate::utils::cache::{effective_permissions_key, ClosureCache};
use crate::utils::transaction::{acquire_graph_lock, GraphLockDomain, TransactionManager};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::info;

/// ロール階層の管理サービス
///
/// 親リンクの変更はロール階層のロックドメインで直列化する。
/// 依存グラフとは独立したドメインなので、互いをブロックしない。
pub struct RoleHierarchyService {
    db: Arc<DatabaseConnection>,
    cache: Arc<dyn ClosureCache>,
}

impl RoleHierarchyService {
    pub fn new(db: Arc<DatabaseConnection>, cache: Arc<dyn ClosureCache>) -> Self {
        Self { db, cache }
    }

    /// 親リンクを更新する(`None` で親を外す)
    ///
    /// ロールが自分自身の祖先になる変更は `CircularHierarchy`。
    pub async fn set_parent(&self, role: RoleId, parent: Option<RoleId>) -> AppResult<()> {
        let cache = Arc::clone(&self.cache);

        self.db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    acquire_graph_lock(txn, GraphLockDomain::RoleHierarchy).await?;

                    let hierarchy = load_hierarchy(txn).await?;
                    let record = hierarchy.require(role)?;
                    let role_name = record.name.clone();

                    if let Some(parent_id) = parent {
                        let parent_record = hierarchy.require(parent_id)?;
                        if hierarchy.would_create_cycle(role, parent_id) {
                            return Err(AppError::CircularHierarchy(format!(
                                "'{}' cannot become a child of '{}': the role would be its own ancestor",
                                role_name, parent_record.name
                            )));
                        }
                    }

                    RoleRepository::set_parent(txn, role, parent).await?;

                    // 実効権限は祖先鎖に依存するため、対象サブツリー分を破棄する
                    cache.invalidate(&effective_permissions_key(role));
                    for descendant in hierarchy.descendants(role) {
                        cache.invalidate(&effective_permissions_key(descendant));
                    }
                    Ok(())
                })
            })
            .await?;

        info!(role = %role, parent = ?parent, "Updated role hierarchy");
        Ok(())
    }

    /// 親リンクの変更が閉路を生むかの事前チェック
    pub async fn would_create_cycle(
        &self,
        role: RoleId,
        candidate_parent: RoleId,
    ) -> AppResult<bool> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;
        hierarchy.require(candidate_parent)?;
        Ok(hierarchy.would_create_cycle(role, candidate_parent))
    }

    /// 祖先を近い順に返す
    pub async fn ancestors(&self, role: RoleId) -> AppResult<Vec<RoleRecord>> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;
        Ok(hierarchy.ancestors(role))
    }

    /// 子孫の一覧(名前順)
    pub async fn descendants(&self, role: RoleId) -> AppResult<Vec<RoleRecord>> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;

        let mut records: Vec<RoleRecord> = hierarchy
            .descendants(role)
            .into_iter()
            .filter_map(|id| hierarchy.get(id).cloned())
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// ルートからの深さ(ルートは0)
    pub async fn depth(&self, role: RoleId) -> AppResult<usize> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;
        Ok(hierarchy.depth(role))
    }

    pub async fn is_root(&self, role: RoleId) -> AppResult<bool> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;
        Ok(hierarchy.is_root(role))
    }

    pub async fn is_leaf(&self, role: RoleId) -> AppResult<bool> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;
        Ok(hierarchy.is_leaf(role))
    }

    /// ルートから自分までの表示名の列
    pub async fn hierarchy_path(&self, role: RoleId) -> AppResult<Vec<String>> {
        let hierarchy = load_hierarchy(self.db.as_ref()).await?;
        hierarchy.require(role)?;
        Ok(hierarchy.hierarchy_path(role))
    }
}
