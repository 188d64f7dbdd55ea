// tests/common/mod.rs
#![allow(dead_code)] // テストバイナリごとに使用するヘルパーが異なる

use access_engine::domain::assignment::{AssignmentResolver, CascadeChange, DirectGrantMap};
use access_engine::domain::catalog::{PermissionCatalog, PermissionRecord};
use access_engine::domain::dependency_graph::DependencyGraph;
use access_engine::domain::ids::{PermissionId, RoleId};
use access_engine::domain::permission_model::PermissionType;
use access_engine::domain::role_hierarchy::{RoleHierarchy, RoleRecord};

/// テスト用の権限レコードを作成
pub fn permission(name: &str, module: &str) -> PermissionRecord {
    PermissionRecord {
        id: PermissionId::new(),
        name: name.to_string(),
        display_name: name.to_string(),
        module: module.to_string(),
        permission_type: PermissionType::Action,
        is_system: false,
    }
}

/// テスト用のシステム保護権限を作成
pub fn system_permission(name: &str, module: &str) -> PermissionRecord {
    PermissionRecord {
        is_system: true,
        ..permission(name, module)
    }
}

/// テスト用のロールレコードを作成
pub fn role(name: &str, parent: Option<RoleId>) -> RoleRecord {
    RoleRecord {
        id: RoleId::new(),
        name: name.to_string(),
        display_name: name.to_string(),
        parent_id: parent,
        is_active: true,
    }
}

/// 付与解決のテストに使うインメモリの状態一式
pub struct World {
    pub catalog: PermissionCatalog,
    pub graph: DependencyGraph,
    pub hierarchy: RoleHierarchy,
    pub grants: DirectGrantMap,
}

impl World {
    pub fn new(permissions: Vec<PermissionRecord>, roles: Vec<RoleRecord>) -> Self {
        let catalog = PermissionCatalog::from_records(permissions);
        let graph = DependencyGraph::from_parts(catalog.ids(), Vec::new());
        let hierarchy = RoleHierarchy::from_records(roles);
        Self {
            catalog,
            graph,
            hierarchy,
            grants: DirectGrantMap::new(),
        }
    }

    pub fn resolver(&self) -> AssignmentResolver<'_> {
        AssignmentResolver::new(&self.catalog, &self.graph, &self.hierarchy, &self.grants)
    }

    /// カスケード差分を直接付与テーブルへ反映する(サービス層の永続化に相当)
    pub fn apply(&mut self, change: &CascadeChange) {
        let entry = self.grants.entry(change.role_id).or_default();
        for p in &change.granted {
            entry.insert(*p);
        }
        for p in &change.revoked {
            entry.remove(p);
        }
    }

    /// 付与を計画して即反映する
    pub fn grant(&mut self, role: RoleId, permission: PermissionId) -> CascadeChange {
        let change = self.resolver().plan_grant(role, permission).unwrap();
        self.apply(&change);
        change
    }

    /// 剥奪を計画して即反映する
    pub fn revoke(&mut self, role: RoleId, permission: PermissionId) -> CascadeChange {
        let change = self.resolver().plan_revoke(role, permission).unwrap();
        self.apply(&change);
        change
    }
}
