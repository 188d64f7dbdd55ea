// access-engine/src/repository/permission_repository.rs

use crate::domain::permission_model::{self, Entity as Permission};
use crate::error::AppResult;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

/// 権限リポジトリ
///
/// 読み取りはエンジン側で隣接マップに展開するため、ここでは
/// 一括ロードと単体ルックアップのみを提供する。
pub struct PermissionRepository;

impl PermissionRepository {
    /// すべての権限を取得
    pub async fn find_all<C: ConnectionTrait>(db: &C) -> AppResult<Vec<permission_model::Model>> {
        let permissions = Permission::find()
            .order_by_asc(permission_model::Column::Module)
            .order_by_asc(permission_model::Column::Name)
            .all(db)
            .await?;
        Ok(permissions)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> AppResult<Option<permission_model::Model>> {
        let permission = Permission::find_by_id(id).one(db).await?;
        Ok(permission)
    }

    /// 名前による境界での解決用
    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> AppResult<Option<permission_model::Model>> {
        let permission = Permission::find()
            .filter(permission_model::Column::Name.eq(name))
            .one(db)
            .await?;
        Ok(permission)
    }
}
