// access-engine/src/utils/transaction.rs

//! トランザクション管理の統一化
//!
//! グラフを変更する操作は全て、チェックと書き込みを同一トランザクション
//! 内で行う。さらにグラフ単位のアドバイザリロックを取ることで、
//! 「双方が変更前のグラフで閉路なしと判定してから両方挿入する」
//! 更新競合を防ぐ。

use crate::error::AppError;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, Statement,
    TransactionTrait,
};
use std::future::Future;
use tracing::{debug, error, instrument, warn};

// =============================================================================
// トランザクション管理トレイト
// =============================================================================

/// トランザクション実行を抽象化するトレイト
pub trait TransactionManager {
    /// トランザクション内で操作を実行
    #[allow(clippy::manual_async_fn)]
    fn execute_in_transaction<F, R>(
        &self,
        operation: F,
    ) -> impl std::future::Future<Output = Result<R, AppError>> + Send
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<R, AppError>>
            + Send
            + 'static,
        R: Send + 'static;
}

// Future型エイリアス（Boxed Future）
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// DatabaseConnection への実装
impl TransactionManager for DatabaseConnection {
    #[instrument(skip(self, operation), name = "database_transaction")]
    #[allow(clippy::manual_async_fn)]
    fn execute_in_transaction<F, R>(
        &self,
        operation: F,
    ) -> impl std::future::Future<Output = Result<R, AppError>> + Send
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<R, AppError>>
            + Send
            + 'static,
        R: Send + 'static,
    {
        async move {
            debug!("Starting database transaction");

            let txn = self.begin().await.map_err(|e| {
                error!(error = %e, "Failed to begin transaction");
                AppError::InternalServerError("Failed to begin transaction".to_string())
            })?;

            match operation(&txn).await {
                Ok(value) => {
                    txn.commit().await.map_err(|e| {
                        error!(error = %e, "Failed to commit transaction");
                        AppError::InternalServerError("Failed to commit transaction".to_string())
                    })?;
                    debug!("Transaction committed");
                    Ok(value)
                }
                Err(app_error) => {
                    warn!(error = %app_error, error_type = app_error.error_type(), "Transaction operation failed, rolling back");

                    if let Err(rollback_error) = txn.rollback().await {
                        error!(error = %rollback_error, "Failed to roll back transaction");
                    }
                    Err(app_error)
                }
            }
        }
    }
}

// =============================================================================
// グラフ単位のアドバイザリロック
// =============================================================================

/// ロックの対象グラフ
///
/// 依存グラフとロール階層は独立したロックドメイン。互いの変更は
/// 競合しないため、別々のキーで直列化する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphLockDomain {
    DependencyGraph,
    RoleHierarchy,
}

impl GraphLockDomain {
    fn lock_key(&self) -> i64 {
        match self {
            GraphLockDomain::DependencyGraph => 0x4143_4345_5353_0001,
            GraphLockDomain::RoleHierarchy => 0x4143_4345_5353_0002,
        }
    }
}

/// トランザクションスコープのアドバイザリロックを取得する
///
/// トランザクション終了時に自動で解放される。Postgres 以外の
/// バックエンドではトランザクション分離に任せて何もしない。
pub async fn acquire_graph_lock(
    txn: &DatabaseTransaction,
    domain: GraphLockDomain,
) -> Result<(), AppError> {
    if txn.get_database_backend() != DatabaseBackend::Postgres {
        return Ok(());
    }

    txn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "SELECT pg_advisory_xact_lock($1)",
        [domain.lock_key().into()],
    ))
    .await?;

    debug!(domain = ?domain, "Acquired graph advisory lock");
    Ok(())
}
