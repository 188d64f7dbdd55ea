// access-engine/src/error.rs

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),

    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    #[error("Circular role hierarchy: {0}")]
    CircularHierarchy(String),

    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Permission deletion blocked: {}", format_block_reasons(.0))]
    DeletionBlocked(Vec<DeletionBlockReason>),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// ログ出力用のエラー種別
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::DbErr(_) => "database_error",
            AppError::CircularDependency(_) => "circular_dependency",
            AppError::CircularHierarchy(_) => "circular_hierarchy",
            AppError::UnknownPermission(_) => "unknown_permission",
            AppError::UnknownRole(_) => "unknown_role",
            AppError::DeletionBlocked(_) => "deletion_blocked",
            AppError::InternalServerError(_) => "internal_server_error",
        }
    }
}

/// 権限削除をブロックする理由
///
/// 呼び出し側が全てのブロック理由をまとめて提示できるよう、
/// 最初の一件ではなく列挙可能な形で返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeletionBlockReason {
    /// ロールに直接付与されている
    GrantedToRoles { role_names: Vec<String> },
    /// 他の権限がこの権限に依存している
    RequiredByPermissions { permission_names: Vec<String> },
    /// システム保護された権限
    SystemProtected,
}

impl std::fmt::Display for DeletionBlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionBlockReason::GrantedToRoles { role_names } => {
                write!(f, "granted to roles [{}]", role_names.join(", "))
            }
            DeletionBlockReason::RequiredByPermissions { permission_names } => {
                write!(f, "required by permissions [{}]", permission_names.join(", "))
            }
            DeletionBlockReason::SystemProtected => write!(f, "system protected"),
        }
    }
}

fn format_block_reasons(reasons: &[DeletionBlockReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// Result 型のエイリアス
pub type AppResult<T> = Result<T, AppError>;
