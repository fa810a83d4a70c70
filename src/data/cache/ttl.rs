//! TTL 缓存实现
//!
//! 进程内的键值缓存，特点：
//! - 无容量上限，不做后台清理
//! - 惰性过期：只在 `get` 时检查，过期条目被删除
//! - `Clone` 得到的是同一份缓存的句柄，可跨任务共享
//!
//! # 使用示例
//!
//! ```rust
//! use std::time::Duration;
//! use costwatch::data::TtlCache;
//!
//! let cache = TtlCache::new(Duration::from_secs(600));
//! cache.put("key".to_string(), 42);
//! assert_eq!(cache.get(&"key".to_string()), Some(42));
//! ```

use super::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 缓存条目，包含值和写入时间
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    payload: V,
    fetched_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// 检查是否已过期（`now - fetched_at >= ttl`）
    fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.fetched_at) >= ttl
    }
}

/// TTL 缓存
pub struct TtlCache<K, V> {
    entries: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            clock: Arc::clone(&self.clock),
            ttl: self.ttl,
        }
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// 使用系统时钟创建缓存
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建缓存
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    /// 获取缓存值
    ///
    /// - `Some(V)`: 键存在且未过期
    /// - `None`: 键不存在，或已过期（过期条目同时被删除）
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let ttl = self.chrono_ttl();
        let mut entries = self.entries.lock().ok()?;

        let expired = entries.get(key)?.is_expired(now, ttl);
        if expired {
            entries.remove(key);
            tracing::debug!(ttl_secs = self.ttl.as_secs(), "缓存条目已过期");
            return None;
        }

        entries.get(key).map(|entry| entry.payload.clone())
    }

    /// 写入缓存，无条件覆盖已有条目并刷新写入时间
    pub fn put(&self, key: K, payload: V) {
        let entry = CacheEntry {
            payload,
            fetched_at: self.clock.now(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, entry);
        }
    }

    /// 删除指定键
    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .ok()?
            .remove(key)
            .map(|entry| entry.payload)
    }

    /// 清空所有缓存
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// 当前条目数（包含尚未被惰性清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn chrono_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX)
    }
}
