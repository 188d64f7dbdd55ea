// tests/role_hierarchy_tests.rs

mod common;

use access_engine::domain::role_hierarchy::RoleHierarchy;
use access_engine::AppError;
use common::role;
use std::collections::HashSet;

#[test]
fn test_parent_of_parent_is_ancestor() {
    let admin = role("admin", None);
    let manager = role("manager", Some(admin.id));
    let staff = role("staff", Some(manager.id));
    let (admin_id, manager_id, staff_id) = (admin.id, manager.id, staff.id);
    let hierarchy = RoleHierarchy::from_records(vec![admin, manager, staff]);

    let ancestors: Vec<_> = hierarchy.ancestors(staff_id).iter().map(|r| r.id).collect();
    assert_eq!(ancestors, vec![manager_id, admin_id]);
    assert_eq!(hierarchy.depth(staff_id), 2);
    assert_eq!(
        hierarchy.hierarchy_path(staff_id),
        vec!["admin".to_string(), "manager".to_string(), "staff".to_string()]
    );
}

#[test]
fn test_reparenting_into_own_subtree_fails() {
    let admin = role("admin", None);
    let manager = role("manager", Some(admin.id));
    let staff = role("staff", Some(manager.id));
    let (admin_id, staff_id) = (admin.id, staff.id);
    let mut hierarchy = RoleHierarchy::from_records(vec![admin, manager, staff]);

    let err = hierarchy.set_parent(admin_id, Some(staff_id)).unwrap_err();
    assert!(matches!(err, AppError::CircularHierarchy(_)));

    // 失敗した変更は階層に影響しない
    assert!(hierarchy.is_root(admin_id));
    assert_eq!(hierarchy.depth(staff_id), 2);
}

#[test]
fn test_forest_with_multiple_roots() {
    let admin = role("admin", None);
    let guest = role("guest", None);
    let member = role("member", Some(admin.id));
    let (admin_id, guest_id, member_id) = (admin.id, guest.id, member.id);
    let hierarchy = RoleHierarchy::from_records(vec![admin, guest, member]);

    assert!(hierarchy.is_root(admin_id));
    assert!(hierarchy.is_root(guest_id));
    assert!(hierarchy.is_leaf(guest_id));
    assert_eq!(hierarchy.descendants(admin_id), HashSet::from([member_id]));
    assert!(hierarchy.descendants(guest_id).is_empty());
}

#[test]
fn test_move_subtree_between_roots() {
    let admin = role("admin", None);
    let guest = role("guest", None);
    let member = role("member", Some(admin.id));
    let junior = role("junior", Some(member.id));
    let (admin_id, guest_id, member_id, junior_id) = (admin.id, guest.id, member.id, junior.id);
    let mut hierarchy = RoleHierarchy::from_records(vec![admin, guest, member, junior]);

    hierarchy.set_parent(member_id, Some(guest_id)).unwrap();

    assert_eq!(
        hierarchy.descendants(guest_id),
        HashSet::from([member_id, junior_id])
    );
    assert!(hierarchy.descendants(admin_id).is_empty());
    // 子孫側の経路も付け替え後のルートを指す
    assert_eq!(
        hierarchy.hierarchy_path(junior_id),
        vec!["guest".to_string(), "member".to_string(), "junior".to_string()]
    );
}
