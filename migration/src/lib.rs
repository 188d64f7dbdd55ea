// migration/src/lib.rs
pub use sea_orm_migration::prelude::*;

// マイグレーションモジュール
mod m20260301_000001_create_permissions_table;
mod m20260301_000002_create_roles_table;
mod m20260301_000003_create_permission_dependencies_table;
mod m20260301_000004_create_role_permissions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            // 1. 基本テーブル作成（依存関係なし）
            Box::new(m20260301_000001_create_permissions_table::Migration),
            Box::new(m20260301_000002_create_roles_table::Migration),
            // 2. 関連テーブル作成（permissions / roles に依存）
            Box::new(m20260301_000003_create_permission_dependencies_table::Migration),
            Box::new(m20260301_000004_create_role_permissions_table::Migration),
        ]
    }
}
