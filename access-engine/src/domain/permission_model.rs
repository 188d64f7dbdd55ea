// access-engine/src/domain/permission_model.rs
use crate::domain::catalog::PermissionRecord;
use crate::domain::ids::PermissionId;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 権限エンティティ
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub name: String,

    pub display_name: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    pub module: String,

    pub permission_type: String,

    pub is_system: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 権限種別を表すenum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionType {
    Menu,
    Action,
    Api,
}

impl PermissionType {
    /// 権限種別を文字列として取得
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Menu => "menu",
            PermissionType::Action => "action",
            PermissionType::Api => "api",
        }
    }

    /// 文字列から権限種別を解析
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "menu" => Some(PermissionType::Menu),
            "action" => Some(PermissionType::Action),
            "api" => Some(PermissionType::Api),
            _ => None,
        }
    }
}

impl Default for PermissionType {
    fn default() -> Self {
        PermissionType::Action
    }
}

impl std::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[allow(dead_code)]
impl Model {
    /// 新しい権限を作成
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        name: String,
        display_name: String,
        module: String,
        permission_type: PermissionType,
        is_system: bool,
    ) -> ActiveModel {
        let now = Utc::now();
        ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            display_name: Set(display_name),
            description: Set(None),
            module: Set(module),
            permission_type: Set(permission_type.as_str().to_string()),
            is_system: Set(is_system),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// ドメイン層で扱うレコードへ変換
    ///
    /// 未知の権限種別は既定値として扱う(読み取りはエラーにしない)。
    pub fn to_record(&self) -> PermissionRecord {
        PermissionRecord {
            id: PermissionId(self.id),
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            module: self.module.clone(),
            permission_type: PermissionType::from_str(&self.permission_type).unwrap_or_default(),
            is_system: self.is_system,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_type_conversion() {
        assert_eq!(PermissionType::Menu.as_str(), "menu");
        assert_eq!(PermissionType::from_str("ACTION"), Some(PermissionType::Action));
        assert_eq!(PermissionType::from_str("api"), Some(PermissionType::Api));
        assert_eq!(PermissionType::from_str("unknown"), None);
    }

    #[test]
    fn test_to_record_defaults_unknown_type() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            name: "users.view".to_string(),
            display_name: "View users".to_string(),
            description: None,
            module: "users".to_string(),
            permission_type: "legacy-type".to_string(),
            is_system: false,
            created_at: now,
            updated_at: now,
        };

        let record = model.to_record();
        assert_eq!(record.permission_type, PermissionType::Action);
        assert_eq!(record.id.as_uuid(), model.id);
    }
}
