// access-engine/src/service/integrity_service.rs

use crate::domain::ids::{PermissionId, RoleId};
use crate::domain::integrity::{validate_snapshot, AccessSnapshot, GrantRecord, IntegrityReport};
use crate::error::AppResult;
use crate::repository::dependency_repository::DependencyRepository;
use crate::repository::permission_repository::PermissionRepository;
use crate::repository::role_permission_repository::RolePermissionRepository;
use crate::repository::role_repository::RoleRepository;
use crate::utils::transaction::TransactionManager;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, warn};

/// システム全体の整合性検証サービス
///
/// 個々の変更とは独立したメンテナンス操作。検証ロジック自体は
/// 失敗せず、どれだけ不整合があってもレポートとして返す。
pub struct IntegrityService {
    db: Arc<DatabaseConnection>,
}

impl IntegrityService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// スナップショット全体を検証する
    ///
    /// 一貫した断面を読むため、読み取りも単一トランザクションで行う。
    pub async fn validate(&self) -> AppResult<IntegrityReport> {
        let report = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    let permissions = PermissionRepository::find_all(txn).await?;
                    let edges = DependencyRepository::find_all(txn).await?;
                    let roles = RoleRepository::find_all(txn).await?;
                    let grants = RolePermissionRepository::find_all(txn).await?;

                    let snapshot = AccessSnapshot {
                        permissions: permissions.iter().map(|m| m.to_record()).collect(),
                        edges: edges.iter().map(|m| m.to_edge()).collect(),
                        roles: roles.iter().map(|m| m.to_record()).collect(),
                        grants: grants
                            .iter()
                            .map(|m| GrantRecord {
                                role_id: RoleId(m.role_id),
                                permission_id: PermissionId(m.permission_id),
                            })
                            .collect(),
                    };

                    Ok(validate_snapshot(&snapshot))
                })
            })
            .await?;

        if report.is_valid {
            info!("Integrity check passed");
        } else {
            warn!(total_issues = report.total_issues, "Integrity check found issues");
        }
        Ok(report)
    }
}
