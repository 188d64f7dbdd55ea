// access-engine/src/repository/role_permission_repository.rs

use crate::domain::ids::{PermissionId, RoleId};
use crate::domain::role_permission_model::{self, Entity as RolePermission};
use crate::error::AppResult;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::debug;
use uuid::Uuid;

/// 直接付与リポジトリ
pub struct RolePermissionRepository;

impl RolePermissionRepository {
    /// すべての直接付与を取得
    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
    ) -> AppResult<Vec<role_permission_model::Model>> {
        let grants = RolePermission::find().all(db).await?;
        Ok(grants)
    }

    /// 特定ロールの直接付与を取得
    pub async fn find_by_role<C: ConnectionTrait>(
        db: &C,
        role: RoleId,
    ) -> AppResult<Vec<role_permission_model::Model>> {
        let grants = RolePermission::find()
            .filter(role_permission_model::Column::RoleId.eq(role.as_uuid()))
            .all(db)
            .await?;
        Ok(grants)
    }

    /// 直接付与をまとめて挿入する(カスケード付与の書き込み)
    pub async fn insert_many<C: ConnectionTrait>(
        db: &C,
        role: RoleId,
        permissions: &[PermissionId],
        granted_by: Option<Uuid>,
    ) -> AppResult<u64> {
        if permissions.is_empty() {
            return Ok(0);
        }

        let models: Vec<role_permission_model::ActiveModel> = permissions
            .iter()
            .map(|&p| role_permission_model::Model::new(role, p, granted_by))
            .collect();

        let inserted = RolePermission::insert_many(models)
            .exec_without_returning(db)
            .await?;
        debug!(role = %role, count = inserted, "Inserted direct grants");
        Ok(inserted)
    }

    /// 直接付与をまとめて削除する(カスケード剥奪の書き込み)
    pub async fn delete_many<C: ConnectionTrait>(
        db: &C,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> AppResult<u64> {
        if permissions.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = permissions.iter().map(|p| p.as_uuid()).collect();
        let result = RolePermission::delete_many()
            .filter(role_permission_model::Column::RoleId.eq(role.as_uuid()))
            .filter(role_permission_model::Column::PermissionId.is_in(ids))
            .exec(db)
            .await?;
        debug!(role = %role, count = result.rows_affected, "Deleted direct grants");
        Ok(result.rows_affected)
    }
}
