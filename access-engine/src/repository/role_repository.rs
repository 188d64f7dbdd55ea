// access-engine/src/repository/role_repository.rs

use crate::domain::ids::RoleId;
use crate::domain::role_model::{self, Entity as Role};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;
use uuid::Uuid;

/// ロールリポジトリ
pub struct RoleRepository;

impl RoleRepository {
    /// すべてのロールを取得
    pub async fn find_all<C: ConnectionTrait>(db: &C) -> AppResult<Vec<role_model::Model>> {
        let roles = Role::find()
            .order_by_asc(role_model::Column::Name)
            .all(db)
            .await?;
        Ok(roles)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> AppResult<Option<role_model::Model>> {
        let role = Role::find_by_id(id).one(db).await?;
        Ok(role)
    }

    /// 名前による境界での解決用
    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> AppResult<Option<role_model::Model>> {
        let role = Role::find()
            .filter(role_model::Column::Name.eq(name))
            .one(db)
            .await?;
        Ok(role)
    }

    /// 親リンクを更新する
    pub async fn set_parent<C: ConnectionTrait>(
        db: &C,
        role: RoleId,
        parent: Option<RoleId>,
    ) -> AppResult<()> {
        let result = Role::update_many()
            .col_expr(
                role_model::Column::ParentId,
                Expr::value(parent.map(|p| p.as_uuid())),
            )
            .col_expr(role_model::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(role_model::Column::Id.eq(role.as_uuid()))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::UnknownRole(role.to_string()));
        }
        debug!(role = %role, parent = ?parent, "Updated role parent link");
        Ok(())
    }
}
