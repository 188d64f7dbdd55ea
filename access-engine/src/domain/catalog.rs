// access-engine/src/domain/catalog.rs

use crate::domain::ids::PermissionId;
use crate::domain::permission_model::PermissionType;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::collections::HashMap;

/// 権限の属性スナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub name: String,
    pub display_name: String,
    pub module: String,
    pub permission_type: PermissionType,
    pub is_system: bool,
}

/// 権限カタログ
///
/// IDと名前の両方から権限を引けるインデックス。名前はIDの副次キーで、
/// 境界での名前解決にのみ使う。構築時に検出した名前重複は保持しておき、
/// 整合性検証から参照する。
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    by_id: HashMap<PermissionId, PermissionRecord>,
    by_name: HashMap<String, PermissionId>,
    duplicate_names: Vec<String>,
}

impl PermissionCatalog {
    pub fn from_records(records: impl IntoIterator<Item = PermissionRecord>) -> Self {
        let mut catalog = Self::default();

        for record in records {
            if let Some(existing) = catalog.by_name.get(&record.name) {
                if *existing != record.id {
                    catalog.duplicate_names.push(record.name.clone());
                }
            } else {
                catalog.by_name.insert(record.name.clone(), record.id);
            }
            catalog.by_id.insert(record.id, record);
        }

        catalog
    }

    pub fn contains(&self, id: PermissionId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, id: PermissionId) -> Option<&PermissionRecord> {
        self.by_id.get(&id)
    }

    /// IDの存在を要求する(不明なIDは `UnknownPermission`)
    pub fn require(&self, id: PermissionId) -> AppResult<&PermissionRecord> {
        self.get(id)
            .ok_or_else(|| AppError::UnknownPermission(id.to_string()))
    }

    pub fn id_by_name(&self, name: &str) -> Option<PermissionId> {
        self.by_name.get(name).copied()
    }

    /// 名前の存在を要求する(不明な名前は `UnknownPermission`)
    pub fn require_by_name(&self, name: &str) -> AppResult<&PermissionRecord> {
        self.id_by_name(name)
            .and_then(|id| self.get(id))
            .ok_or_else(|| AppError::UnknownPermission(name.to_string()))
    }

    /// 表示用の名前を取得(未登録IDはID文字列のまま)
    pub fn display_name_of(&self, id: PermissionId) -> String {
        self.get(id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn ids(&self) -> impl Iterator<Item = PermissionId> + '_ {
        self.by_id.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// 構築時に検出した名前重複
    pub fn duplicate_names(&self) -> &[String] {
        &self.duplicate_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> PermissionRecord {
        PermissionRecord {
            id: PermissionId::new(),
            name: name.to_string(),
            display_name: name.to_string(),
            module: "users".to_string(),
            permission_type: PermissionType::Action,
            is_system: false,
        }
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let view = record("users.view");
        let view_id = view.id;
        let catalog = PermissionCatalog::from_records(vec![view, record("users.edit")]);

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(view_id));
        assert_eq!(catalog.id_by_name("users.view"), Some(view_id));
        assert_eq!(catalog.id_by_name("users.delete"), None);
    }

    #[test]
    fn test_require_unknown_id_fails() {
        let catalog = PermissionCatalog::from_records(vec![record("users.view")]);
        let missing = PermissionId::new();

        let err = catalog.require(missing).unwrap_err();
        assert!(matches!(err, AppError::UnknownPermission(_)));
    }

    #[test]
    fn test_duplicate_names_are_collected() {
        let first = record("users.view");
        let second = record("users.view");
        let catalog = PermissionCatalog::from_records(vec![first, second]);

        assert_eq!(catalog.duplicate_names(), ["users.view".to_string()].as_slice());
        // 重複があっても最初の解決結果は安定している
        assert!(catalog.id_by_name("users.view").is_some());
    }
}
