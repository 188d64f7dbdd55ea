// access-engine/src/domain/role_hierarchy.rs

use crate::domain::ids::RoleId;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// ロールの属性スナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub parent_id: Option<RoleId>,
    pub is_active: bool,
}

/// ロール階層
///
/// 親リンクの張る森。各ロールの親は高々1つで、自分自身の祖先には
/// なれない。祖先方向の探索は親リンクを辿り、訪問済みガードで
/// 不正な既存データ上でも停止する。
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    roles: HashMap<RoleId, RoleRecord>,
    children: HashMap<RoleId, HashSet<RoleId>>,
}

impl RoleHierarchy {
    pub fn from_records(records: impl IntoIterator<Item = RoleRecord>) -> Self {
        let mut hierarchy = Self::default();
        for record in records {
            hierarchy.roles.insert(record.id, record);
        }

        let links: Vec<(RoleId, RoleId)> = hierarchy
            .roles
            .values()
            .filter_map(|r| r.parent_id.map(|parent| (parent, r.id)))
            .collect();
        for (parent, child) in links {
            hierarchy.children.entry(parent).or_default().insert(child);
        }
        hierarchy
    }

    pub fn contains(&self, role: RoleId) -> bool {
        self.roles.contains_key(&role)
    }

    pub fn get(&self, role: RoleId) -> Option<&RoleRecord> {
        self.roles.get(&role)
    }

    /// IDの存在を要求する(不明なIDは `UnknownRole`)
    pub fn require(&self, role: RoleId) -> AppResult<&RoleRecord> {
        self.get(role)
            .ok_or_else(|| AppError::UnknownRole(role.to_string()))
    }

    pub fn id_by_name(&self, name: &str) -> Option<RoleId> {
        self.roles
            .values()
            .find(|r| r.name == name)
            .map(|r| r.id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.roles.keys().copied()
    }

    /// `role` の親を `candidate_parent` にすると閉路になるか
    ///
    /// 自己親、または `candidate_parent` の祖先鎖を辿って `role` に
    /// 到達する場合に真(role が自分自身の祖先になってしまう)。
    pub fn would_create_cycle(&self, role: RoleId, candidate_parent: RoleId) -> bool {
        if role == candidate_parent {
            return true;
        }

        let mut visited = HashSet::from([candidate_parent]);
        let mut cursor = candidate_parent;
        while let Some(parent) = self.roles.get(&cursor).and_then(|r| r.parent_id) {
            if parent == role {
                return true;
            }
            if !visited.insert(parent) {
                // 既存データ側の閉路。これ以上辿っても role には届かない
                return false;
            }
            cursor = parent;
        }
        false
    }

    /// 親リンクを更新する
    ///
    /// 閉路を生む場合は `CircularHierarchy`。`None` で親リンクを外す。
    pub fn set_parent(&mut self, role: RoleId, parent: Option<RoleId>) -> AppResult<()> {
        self.require(role)?;
        if let Some(parent_id) = parent {
            self.require(parent_id)?;
            if self.would_create_cycle(role, parent_id) {
                return Err(AppError::CircularHierarchy(format!(
                    "setting parent of {} to {} would make the role its own ancestor",
                    role, parent_id
                )));
            }
        }

        let previous = self.roles.get(&role).and_then(|r| r.parent_id);
        if let Some(prev) = previous {
            if let Some(siblings) = self.children.get_mut(&prev) {
                siblings.remove(&role);
            }
        }
        if let Some(parent_id) = parent {
            self.children.entry(parent_id).or_default().insert(role);
        }
        if let Some(record) = self.roles.get_mut(&role) {
            record.parent_id = parent;
        }
        Ok(())
    }

    /// 祖先を近い順に返す(直近の親が先頭、ルートが末尾)
    pub fn ancestors(&self, role: RoleId) -> Vec<RoleRecord> {
        let mut result = Vec::new();
        let mut visited = HashSet::from([role]);
        let mut cursor = role;

        while let Some(parent) = self.roles.get(&cursor).and_then(|r| r.parent_id) {
            if !visited.insert(parent) {
                break;
            }
            match self.roles.get(&parent) {
                Some(record) => result.push(record.clone()),
                None => break,
            }
            cursor = parent;
        }
        result
    }

    /// 祖先鎖に `role` を含む全ロール
    pub fn descendants(&self, role: RoleId) -> HashSet<RoleId> {
        let mut result = HashSet::new();
        let mut queue = VecDeque::from([role]);

        while let Some(current) = queue.pop_front() {
            if let Some(children) = self.children.get(&current) {
                for &child in children {
                    if result.insert(child) {
                        queue.push_back(child);
                    }
                }
            }
        }
        result
    }

    /// ルートからの深さ(ルートは0)
    pub fn depth(&self, role: RoleId) -> usize {
        self.ancestors(role).len()
    }

    /// 有効な(無効化されていない)ロールか
    pub fn is_active(&self, role: RoleId) -> bool {
        self.roles.get(&role).map(|r| r.is_active).unwrap_or(false)
    }

    pub fn is_root(&self, role: RoleId) -> bool {
        self.roles
            .get(&role)
            .map(|r| r.parent_id.is_none())
            .unwrap_or(false)
    }

    pub fn is_leaf(&self, role: RoleId) -> bool {
        if !self.contains(role) {
            return false;
        }
        self.children
            .get(&role)
            .map(|c| c.is_empty())
            .unwrap_or(true)
    }

    /// ルートから自分までの表示名の列
    pub fn hierarchy_path(&self, role: RoleId) -> Vec<String> {
        let Some(record) = self.roles.get(&role) else {
            return Vec::new();
        };

        let mut path: Vec<String> = self
            .ancestors(role)
            .iter()
            .rev()
            .map(|r| r.display_name.clone())
            .collect();
        path.push(record.display_name.clone());
        path
    }
}
