use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // permission_dependenciesテーブル作成
        // permission_id が depends_on_id を必要とする有向辺
        manager
            .create_table(
                Table::create()
                    .table(PermissionDependencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PermissionDependencies::PermissionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionDependencies::DependsOnId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionDependencies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(PermissionDependencies::PermissionId)
                            .col(PermissionDependencies::DependsOnId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permission_dependencies_permission_id")
                            .from(
                                PermissionDependencies::Table,
                                PermissionDependencies::PermissionId,
                            )
                            .to(Permissions::Table, Permissions::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permission_dependencies_depends_on_id")
                            .from(
                                PermissionDependencies::Table,
                                PermissionDependencies::DependsOnId,
                            )
                            .to(Permissions::Table, Permissions::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 逆向きの探索(被依存側)用インデックス
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_permission_dependencies_depends_on_id")
                    .table(PermissionDependencies::Table)
                    .col(PermissionDependencies::DependsOnId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // インデックス削除
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_permission_dependencies_depends_on_id")
                    .to_owned(),
            )
            .await?;

        // テーブル削除
        manager
            .drop_table(
                Table::drop()
                    .table(PermissionDependencies::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum PermissionDependencies {
    Table,
    PermissionId,
    DependsOnId,
    CreatedAt,
}

#[derive(Iden)]
enum Permissions {
    Table,
    Id,
}
