// access-engine/src/domain/permission_dependency_model.rs
use crate::domain::dependency_graph::DependencyEdge;
use crate::domain::ids::PermissionId;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 権限依存エッジエンティティ
///
/// `permission_id` が `depends_on_id` を必要とする、という有向辺。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "permission_dependencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub permission_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub depends_on_id: Uuid,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::permission_model::Entity",
        from = "Column::PermissionId",
        to = "super::permission_model::Column::Id"
    )]
    Permission,
    #[sea_orm(
        belongs_to = "super::permission_model::Entity",
        from = "Column::DependsOnId",
        to = "super::permission_model::Column::Id"
    )]
    DependsOn,
}

impl Related<super::permission_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[allow(dead_code)]
impl Model {
    /// 新しい依存エッジを作成
    #[allow(clippy::new_ret_no_self)]
    pub fn new(permission_id: PermissionId, depends_on_id: PermissionId) -> ActiveModel {
        ActiveModel {
            permission_id: Set(permission_id.as_uuid()),
            depends_on_id: Set(depends_on_id.as_uuid()),
            created_at: Set(Utc::now()),
        }
    }

    /// ドメイン層で扱うエッジへ変換
    pub fn to_edge(&self) -> DependencyEdge {
        DependencyEdge {
            permission_id: PermissionId(self.permission_id),
            depends_on_id: PermissionId(self.depends_on_id),
        }
    }
}
