// access-engine/src/domain/assignment.rs

use crate::domain::catalog::PermissionCatalog;
use crate::domain::dependency_graph::DependencyGraph;
use crate::domain::ids::{PermissionId, RoleId};
use crate::domain::role_hierarchy::RoleHierarchy;
use crate::error::{AppResult, DeletionBlockReason};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// ロールごとの直接付与テーブル
pub type DirectGrantMap = HashMap<RoleId, HashSet<PermissionId>>;

/// カスケード適用の結果
///
/// 1回の付与/剥奪で実際に増減した権限の全体。監査通知の
/// ペイロードにもそのまま使う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeChange {
    pub role_id: RoleId,
    pub granted: Vec<PermissionId>,
    pub revoked: Vec<PermissionId>,
}

impl CascadeChange {
    pub fn empty(role_id: RoleId) -> Self {
        Self {
            role_id,
            granted: Vec::new(),
            revoked: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }
}

/// 付与解決器
///
/// 依存グラフ・ロール階層・直接付与のスナップショットから実効権限と
/// カスケード差分を計算する。状態は一切持たず、永続化は呼び出し側の
/// 責務。継承は読み取り専用で、カスケードが祖先や子孫の直接付与を
/// 書き換えることはない。
pub struct AssignmentResolver<'a> {
    catalog: &'a PermissionCatalog,
    graph: &'a DependencyGraph,
    hierarchy: &'a RoleHierarchy,
    grants: &'a DirectGrantMap,
}

impl<'a> AssignmentResolver<'a> {
    pub fn new(
        catalog: &'a PermissionCatalog,
        graph: &'a DependencyGraph,
        hierarchy: &'a RoleHierarchy,
        grants: &'a DirectGrantMap,
    ) -> Self {
        Self {
            catalog,
            graph,
            hierarchy,
            grants,
        }
    }

    fn direct_grants(&self, role: RoleId) -> HashSet<PermissionId> {
        self.grants.get(&role).cloned().unwrap_or_default()
    }

    /// ロールの実効権限集合
    ///
    /// 自分と全祖先の直接付与に、それぞれの依存閉包を合わせたもの。
    /// カタログに存在しない付与行は結果から黙って除外する。
    pub fn effective_permissions(&self, role: RoleId) -> AppResult<HashSet<PermissionId>> {
        self.hierarchy.require(role)?;

        let mut chain = vec![role];
        chain.extend(self.hierarchy.ancestors(role).iter().map(|r| r.id));

        let mut effective = HashSet::new();
        for member in chain {
            if let Some(direct) = self.grants.get(&member) {
                for &permission in direct {
                    if !self.catalog.contains(permission) {
                        continue;
                    }
                    effective.insert(permission);
                    effective.extend(self.graph.all_dependencies(permission));
                }
            }
        }
        Ok(effective)
    }

    /// カスケード付与の差分を計算する
    ///
    /// 対象の権限とその依存閉包のうち、まだ直接付与されていないものが
    /// 追加対象。すでに実効権限に含まれる場合は何もしない。
    pub fn plan_grant(&self, role: RoleId, permission: PermissionId) -> AppResult<CascadeChange> {
        self.hierarchy.require(role)?;
        self.catalog.require(permission)?;

        if self.effective_permissions(role)?.contains(&permission) {
            return Ok(CascadeChange::empty(role));
        }

        let direct = self.direct_grants(role);
        let mut additions: HashSet<PermissionId> = self
            .graph
            .all_dependencies(permission)
            .into_iter()
            .filter(|p| self.catalog.contains(*p))
            .collect();
        additions.insert(permission);
        additions.retain(|p| !direct.contains(p));

        let mut granted: Vec<PermissionId> = additions.into_iter().collect();
        granted.sort();

        Ok(CascadeChange {
            role_id: role,
            granted,
            revoked: Vec::new(),
        })
    }

    /// カスケード剥奪の差分を計算する
    ///
    /// 対象の権限に加え、それを(推移的に)必要とする直接付与も全て
    /// 剥奪対象。不動点まで適用した結果に等しい。直接付与されていない
    /// 権限の剥奪は何もしない。
    pub fn plan_revoke(&self, role: RoleId, permission: PermissionId) -> AppResult<CascadeChange> {
        self.hierarchy.require(role)?;
        self.catalog.require(permission)?;

        let direct = self.direct_grants(role);
        if !direct.contains(&permission) {
            return Ok(CascadeChange::empty(role));
        }

        let mut removals: HashSet<PermissionId> = self
            .graph
            .all_dependents(permission)
            .into_iter()
            .filter(|p| direct.contains(p))
            .collect();
        removals.insert(permission);

        let mut revoked: Vec<PermissionId> = removals.into_iter().collect();
        revoked.sort();

        Ok(CascadeChange {
            role_id: role,
            granted: Vec::new(),
            revoked,
        })
    }

    /// 権限削除のブロック理由を列挙する
    ///
    /// 直接付与しているロール、依存している権限、システム保護の
    /// 3種類を全てまとめて返す。空なら削除可能。
    pub fn deletion_blocking_reasons(
        &self,
        permission: PermissionId,
    ) -> AppResult<Vec<DeletionBlockReason>> {
        let record = self.catalog.require(permission)?;
        let mut reasons = Vec::new();

        let mut role_names: Vec<String> = self
            .grants
            .iter()
            .filter(|(_, granted)| granted.contains(&permission))
            .map(|(role_id, _)| {
                self.hierarchy
                    .get(*role_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| role_id.to_string())
            })
            .collect();
        if !role_names.is_empty() {
            role_names.sort();
            reasons.push(DeletionBlockReason::GrantedToRoles { role_names });
        }

        let mut dependent_names: Vec<String> = self
            .graph
            .direct_dependents(permission)
            .into_iter()
            .map(|p| self.catalog.display_name_of(p))
            .collect();
        if !dependent_names.is_empty() {
            dependent_names.sort();
            reasons.push(DeletionBlockReason::RequiredByPermissions {
                permission_names: dependent_names,
            });
        }

        if record.is_system {
            reasons.push(DeletionBlockReason::SystemProtected);
        }

        Ok(reasons)
    }

    pub fn can_delete(&self, permission: PermissionId) -> AppResult<bool> {
        Ok(self.deletion_blocking_reasons(permission)?.is_empty())
    }

    /// 指定した名前の権限を全て実効保持しているか
    pub fn has_all_permissions(&self, role: RoleId, names: &[&str]) -> AppResult<bool> {
        let effective = self.effective_permissions(role)?;
        Ok(names.iter().all(|name| {
            self.catalog
                .id_by_name(name)
                .map(|id| effective.contains(&id))
                .unwrap_or(false)
        }))
    }

    /// 指定した名前の権限をいずれか実効保持しているか
    pub fn has_any_permission(&self, role: RoleId, names: &[&str]) -> AppResult<bool> {
        let effective = self.effective_permissions(role)?;
        Ok(names.iter().any(|name| {
            self.catalog
                .id_by_name(name)
                .map(|id| effective.contains(&id))
                .unwrap_or(false)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::PermissionRecord;
    use crate::domain::permission_model::PermissionType;
    use crate::domain::role_hierarchy::RoleRecord;

    struct Fixture {
        catalog: PermissionCatalog,
        graph: DependencyGraph,
        hierarchy: RoleHierarchy,
        grants: DirectGrantMap,
    }

    impl Fixture {
        fn resolver(&self) -> AssignmentResolver<'_> {
            AssignmentResolver::new(&self.catalog, &self.graph, &self.hierarchy, &self.grants)
        }

        /// 差分を直接付与テーブルへ反映する(サービス層の永続化に相当)
        fn apply(&mut self, change: &CascadeChange) {
            let entry = self.grants.entry(change.role_id).or_default();
            for p in &change.granted {
                entry.insert(*p);
            }
            for p in &change.revoked {
                entry.remove(p);
            }
        }
    }

    fn permission(name: &str) -> PermissionRecord {
        PermissionRecord {
            id: PermissionId::new(),
            name: name.to_string(),
            display_name: name.to_string(),
            module: "tasks".to_string(),
            permission_type: PermissionType::Action,
            is_system: false,
        }
    }

    fn role(name: &str, parent: Option<RoleId>) -> RoleRecord {
        RoleRecord {
            id: RoleId::new(),
            name: name.to_string(),
            display_name: name.to_string(),
            parent_id: parent,
            is_active: true,
        }
    }

    /// view <- edit <- delete の依存鎖と単一ロールを用意
    fn chain_fixture() -> (Fixture, RoleId, PermissionId, PermissionId, PermissionId) {
        let view = permission("tasks.view");
        let edit = permission("tasks.edit");
        let delete = permission("tasks.delete");
        let (view_id, edit_id, delete_id) = (view.id, edit.id, delete.id);

        let catalog = PermissionCatalog::from_records(vec![view, edit, delete]);
        let mut graph = DependencyGraph::from_parts(catalog.ids(), Vec::new());
        graph.add_dependency(edit_id, view_id).unwrap();
        graph.add_dependency(delete_id, edit_id).unwrap();

        let member = role("member", None);
        let member_id = member.id;
        let hierarchy = RoleHierarchy::from_records(vec![member]);

        (
            Fixture {
                catalog,
                graph,
                hierarchy,
                grants: DirectGrantMap::new(),
            },
            member_id,
            view_id,
            edit_id,
            delete_id,
        )
    }

    #[test]
    fn test_grant_cascades_dependencies() {
        let (mut fixture, member, view, edit, delete) = chain_fixture();

        let change = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&change);

        let mut expected = vec![view, edit, delete];
        expected.sort();
        assert_eq!(change.granted, expected);
        assert_eq!(
            fixture.grants[&member],
            HashSet::from([view, edit, delete])
        );
    }

    #[test]
    fn test_grant_is_idempotent() {
        let (mut fixture, member, _, _, delete) = chain_fixture();

        let first = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&first);
        let effective_before = fixture.resolver().effective_permissions(member).unwrap();

        let second = fixture.resolver().plan_grant(member, delete).unwrap();
        assert!(second.is_empty());
        fixture.apply(&second);
        assert_eq!(
            fixture.resolver().effective_permissions(member).unwrap(),
            effective_before
        );
    }

    #[test]
    fn test_revoke_cascades_to_fixed_point() {
        let (mut fixture, member, view, _, delete) = chain_fixture();

        let grant = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&grant);

        // 鎖の根元を剥奪すると依存している全てが連鎖的に外れる
        let revoke = fixture.resolver().plan_revoke(member, view).unwrap();
        fixture.apply(&revoke);

        assert_eq!(revoke.revoked.len(), 3);
        assert!(fixture.grants[&member].is_empty());
    }

    #[test]
    fn test_revoke_middle_keeps_dependencies() {
        let (mut fixture, member, view, edit, delete) = chain_fixture();

        let grant = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&grant);

        let revoke = fixture.resolver().plan_revoke(member, edit).unwrap();
        fixture.apply(&revoke);

        // edit とそれに依存する delete は外れるが view は残る
        let mut expected = vec![edit, delete];
        expected.sort();
        assert_eq!(revoke.revoked, expected);
        assert_eq!(fixture.grants[&member], HashSet::from([view]));
    }

    #[test]
    fn test_revoke_ungranted_is_noop() {
        let (fixture, member, view, _, _) = chain_fixture();

        let change = fixture.resolver().plan_revoke(member, view).unwrap();
        assert!(change.is_empty());
    }

    #[test]
    fn test_cascade_grant_invariant_holds() {
        let (mut fixture, member, _, edit, delete) = chain_fixture();

        let grant = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&grant);
        let revoke = fixture.resolver().plan_revoke(member, edit).unwrap();
        fixture.apply(&revoke);

        // どの時点でも直接付与は依存について閉じている
        let direct = fixture.grants[&member].clone();
        for q in &direct {
            for dep in fixture.graph.all_dependencies(*q) {
                assert!(direct.contains(&dep), "{} requires {}", q, dep);
            }
        }
    }

    #[test]
    fn test_effective_permissions_include_ancestors() {
        let a = permission("reports.view");
        let b = permission("reports.export");
        let (a_id, b_id) = (a.id, b.id);
        let catalog = PermissionCatalog::from_records(vec![a, b]);
        let graph = DependencyGraph::from_parts(catalog.ids(), Vec::new());

        let parent = role("parent", None);
        let parent_id = parent.id;
        let child = role("child", Some(parent_id));
        let child_id = child.id;
        let hierarchy = RoleHierarchy::from_records(vec![parent, child]);

        let mut grants = DirectGrantMap::new();
        grants.insert(parent_id, HashSet::from([a_id]));
        grants.insert(child_id, HashSet::from([b_id]));

        let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);

        assert_eq!(
            resolver.effective_permissions(child_id).unwrap(),
            HashSet::from([a_id, b_id])
        );
        // 継承は読み取り専用: 親の実効権限に子の付与は混ざらない
        assert_eq!(
            resolver.effective_permissions(parent_id).unwrap(),
            HashSet::from([a_id])
        );
    }

    #[test]
    fn test_inherited_permission_makes_grant_noop() {
        let (mut fixture, _, view, _, _) = chain_fixture();

        // member の下に子ロールを追加し、親に view を付与
        let child = role("junior", Some(fixture.hierarchy.ids().next().unwrap()));
        let child_id = child.id;
        let mut records: Vec<RoleRecord> = fixture
            .hierarchy
            .ids()
            .filter_map(|id| fixture.hierarchy.get(id).cloned())
            .collect();
        let parent_id = records[0].id;
        records.push(child);
        fixture.hierarchy = RoleHierarchy::from_records(records);
        fixture.grants.insert(parent_id, HashSet::from([view]));

        let change = fixture.resolver().plan_grant(child_id, view).unwrap();
        assert!(change.is_empty());
    }

    #[test]
    fn test_deletion_blocking_reasons_enumerates_all() {
        let (mut fixture, member, view, _, delete) = chain_fixture();

        let grant = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&grant);

        let reasons = fixture
            .resolver()
            .deletion_blocking_reasons(view)
            .unwrap();

        assert_eq!(reasons.len(), 2);
        assert!(matches!(
            &reasons[0],
            DeletionBlockReason::GrantedToRoles { role_names } if role_names == &vec!["member".to_string()]
        ));
        assert!(matches!(
            &reasons[1],
            DeletionBlockReason::RequiredByPermissions { permission_names }
                if permission_names == &vec!["tasks.edit".to_string()]
        ));
        assert!(!fixture.resolver().can_delete(view).unwrap());
    }

    #[test]
    fn test_system_permission_blocks_deletion() {
        let mut system = permission("auth.manage");
        system.is_system = true;
        let system_id = system.id;
        let catalog = PermissionCatalog::from_records(vec![system]);
        let graph = DependencyGraph::from_parts(catalog.ids(), Vec::new());
        let hierarchy = RoleHierarchy::from_records(Vec::new());
        let grants = DirectGrantMap::new();

        let resolver = AssignmentResolver::new(&catalog, &graph, &hierarchy, &grants);
        let reasons = resolver.deletion_blocking_reasons(system_id).unwrap();

        assert_eq!(reasons, vec![DeletionBlockReason::SystemProtected]);
    }

    #[test]
    fn test_unblocked_permission_can_be_deleted() {
        let (fixture, _, _, _, delete) = chain_fixture();
        // delete は依存される側ではなく、付与もされていない
        assert!(fixture.resolver().can_delete(delete).unwrap());
    }

    #[test]
    fn test_has_all_and_any_permissions() {
        let (mut fixture, member, _, _, delete) = chain_fixture();
        let grant = fixture.resolver().plan_grant(member, delete).unwrap();
        fixture.apply(&grant);

        let resolver = fixture.resolver();
        assert!(resolver
            .has_all_permissions(member, &["tasks.view", "tasks.edit"])
            .unwrap());
        assert!(!resolver
            .has_all_permissions(member, &["tasks.view", "tasks.archive"])
            .unwrap());
        assert!(resolver
            .has_any_permission(member, &["tasks.archive", "tasks.view"])
            .unwrap());
        assert!(!resolver
            .has_any_permission(member, &["tasks.archive"])
            .unwrap());
    }
}
