// access-engine/src/domain/role_permission_model.rs
use crate::domain::ids::{PermissionId, RoleId};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 直接付与エンティティ
///
/// ロールへの明示的な権限付与。依存エッジとは別の関係であり、
/// 継承由来の権限はここには保存しない(常に再計算する)。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "role_permissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub permission_id: Uuid,

    #[sea_orm(nullable)]
    pub granted_by: Option<Uuid>,

    pub granted_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::role_model::Entity",
        from = "Column::RoleId",
        to = "super::role_model::Column::Id"
    )]
    Role,
    #[sea_orm(
        belongs_to = "super::permission_model::Entity",
        from = "Column::PermissionId",
        to = "super::permission_model::Column::Id"
    )]
    Permission,
}

impl Related<super::role_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::permission_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[allow(dead_code)]
impl Model {
    /// 新しい直接付与を作成
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        role_id: RoleId,
        permission_id: PermissionId,
        granted_by: Option<Uuid>,
    ) -> ActiveModel {
        ActiveModel {
            role_id: Set(role_id.as_uuid()),
            permission_id: Set(permission_id.as_uuid()),
            granted_by: Set(granted_by),
            granted_at: Set(Utc::now()),
        }
    }
}
