// access-engine/src/logging.rs

use tracing_subscriber::EnvFilter;

/// tracing の初期化
///
/// 組み込み先のアプリケーションが subscriber を持たない場合に使用する。
/// すでに初期化済みであれば何もしない。
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
