// access-engine/src/domain/role_model.rs
use crate::domain::ids::RoleId;
use crate::domain::role_hierarchy::RoleRecord;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ロールエンティティ
///
/// `parent_id` は親ロールへの自己参照。ロール全体で森を成す
/// (各ロールの親は高々1つ、自分自身の祖先にはなれない)。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub name: String,

    pub display_name: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    #[sea_orm(nullable)]
    pub parent_id: Option<Uuid>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}

#[allow(dead_code)]
impl Model {
    /// 新しいロールを作成
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: String, display_name: String, parent_id: Option<RoleId>) -> ActiveModel {
        let now = Utc::now();
        ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            display_name: Set(display_name),
            description: Set(None),
            parent_id: Set(parent_id.map(|p| p.as_uuid())),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// ドメイン層で扱うレコードへ変換
    pub fn to_record(&self) -> RoleRecord {
        RoleRecord {
            id: RoleId(self.id),
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            parent_id: self.parent_id.map(RoleId),
            is_active: self.is_active,
        }
    }
}
