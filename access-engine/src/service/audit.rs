// access-engine/src/service/audit.rs

use crate::domain::assignment::CascadeChange;
use async_trait::async_trait;
use tracing::info;

/// カスケード結果の通知先
///
/// 付与/剥奪のコミット後に、実際に増減した権限の全体を受け取る。
/// メッセージの整形や配信方法は受け手の責務。
#[async_trait]
pub trait CascadeNotifier: Send + Sync {
    async fn cascade_applied(&self, change: &CascadeChange);
}

/// 監査ログ行として出力する実装
#[derive(Debug, Default)]
pub struct LoggingCascadeNotifier;

#[async_trait]
impl CascadeNotifier for LoggingCascadeNotifier {
    async fn cascade_applied(&self, change: &CascadeChange) {
        let payload =
            serde_json::to_string(change).unwrap_or_else(|_| format!("{:?}", change));
        info!(
            role = %change.role_id,
            granted = change.granted.len(),
            revoked = change.revoked.len(),
            payload = %payload,
            "Permission cascade applied"
        );
    }
}

/// 通知を行わない実装
#[derive(Debug, Default)]
pub struct NoopCascadeNotifier;

#[async_trait]
impl CascadeNotifier for NoopCascadeNotifier {
    async fn cascade_applied(&self, _change: &CascadeChange) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{PermissionId, RoleId};

    #[tokio::test]
    async fn test_logging_notifier_accepts_change() {
        let notifier = LoggingCascadeNotifier;
        let change = CascadeChange {
            role_id: RoleId::new(),
            granted: vec![PermissionId::new()],
            revoked: Vec::new(),
        };
        // パニックせずペイロードを整形できること
        notifier.cascade_applied(&change).await;
    }
}
