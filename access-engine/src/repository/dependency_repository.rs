// access-engine/src/repository/dependency_repository.rs

use crate::domain::ids::PermissionId;
use crate::domain::permission_dependency_model::{self, Entity as PermissionDependency};
use crate::error::AppResult;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::debug;

/// 権限依存エッジリポジトリ
pub struct DependencyRepository;

impl DependencyRepository {
    /// すべての依存エッジを取得
    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
    ) -> AppResult<Vec<permission_dependency_model::Model>> {
        let edges = PermissionDependency::find().all(db).await?;
        Ok(edges)
    }

    /// 依存エッジを挿入する(呼び出し側で重複チェック済みであること)
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        from: PermissionId,
        to: PermissionId,
    ) -> AppResult<()> {
        let edge = permission_dependency_model::Model::new(from, to);
        PermissionDependency::insert(edge)
            .exec_without_returning(db)
            .await?;
        debug!(from = %from, to = %to, "Inserted dependency edge");
        Ok(())
    }

    /// 依存エッジを削除し、削除行数を返す(存在しなくてもエラーにしない)
    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        from: PermissionId,
        to: PermissionId,
    ) -> AppResult<u64> {
        let result = PermissionDependency::delete_many()
            .filter(permission_dependency_model::Column::PermissionId.eq(from.as_uuid()))
            .filter(permission_dependency_model::Column::DependsOnId.eq(to.as_uuid()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
