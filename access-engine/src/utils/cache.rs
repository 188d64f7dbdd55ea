// access-engine/src/utils/cache.rs

//! 閉包計算のメモ化
//!
//! キャッシュは `"<操作>:<対象ID>"` をキーにした読み取り専用の
//! メモであり、正しさには寄与しない。閉路チェックは常に生のグラフ
//! に対して行い、キャッシュは一切参照しない。変更系の操作は
//! コミット前に同一トランザクション内で該当キーを破棄する。

use crate::domain::ids::{PermissionId, RoleId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// 閉包キャッシュのキーを組み立てる
pub fn dependency_closure_key(permission: PermissionId) -> String {
    format!("all_dependencies:{}", permission)
}

pub fn dependent_closure_key(permission: PermissionId) -> String {
    format!("all_dependents:{}", permission)
}

pub fn effective_permissions_key(role: RoleId) -> String {
    format!("effective_permissions:{}", role)
}

/// 閉包キャッシュの協調インターフェース
///
/// プロセス内キャッシュでも分散キャッシュでも差し替えられるよう、
/// キー単位の明示的な破棄だけを要求する。
pub trait ClosureCache: Send + Sync {
    fn get(&self, key: &str) -> Option<HashSet<PermissionId>>;
    fn put(&self, key: &str, value: HashSet<PermissionId>);
    fn invalidate(&self, key: &str);
    fn invalidate_all(&self);
}

/// プロセス内キャッシュ実装
#[derive(Debug, Default)]
pub struct InMemoryClosureCache {
    entries: Mutex<HashMap<String, HashSet<PermissionId>>>,
}

impl InMemoryClosureCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashSet<PermissionId>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClosureCache for InMemoryClosureCache {
    fn get(&self, key: &str) -> Option<HashSet<PermissionId>> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: HashSet<PermissionId>) {
        self.lock().insert(key.to_string(), value);
    }

    fn invalidate(&self, key: &str) {
        self.lock().remove(key);
    }

    fn invalidate_all(&self) {
        self.lock().clear();
    }
}

/// キャッシュなしで運用する場合の実装
#[derive(Debug, Default)]
pub struct NoopClosureCache;

impl ClosureCache for NoopClosureCache {
    fn get(&self, _key: &str) -> Option<HashSet<PermissionId>> {
        None
    }

    fn put(&self, _key: &str, _value: HashSet<PermissionId>) {}

    fn invalidate(&self, _key: &str) {}

    fn invalidate_all(&self) {}
}

/// 設定からキャッシュ実装を選ぶ
pub fn closure_cache_from_config(config: &crate::config::Config) -> Arc<dyn ClosureCache> {
    if config.closure_cache_enabled {
        Arc::new(InMemoryClosureCache::new())
    } else {
        Arc::new(NoopClosureCache)
    }
}
