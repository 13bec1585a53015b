//! 缓存后端抽象

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// 带过期时间的键值缓存
///
/// 单个键上的 get / set 各自原子，但 get 再 set 的组合不是。
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 读取键值，不存在或已过期时返回 None
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值并设置过期时间
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// 删除键，返回是否确有删除
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 键是否存在且未过期
    async fn exists(&self, key: &str) -> Result<bool>;

    /// 后端连通性检查
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// 进程内缓存
///
/// 过期条目在访问时惰性删除，也可通过 `purge_expired` 批量清理。
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清理所有已过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 后台定期清理过期条目，缓存被释放后任务自动退出
    pub fn spawn_purge_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => break,
                }
            }
        })
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let expired = {
            let entry = self.entries.get(key)?;
            let (value, expires_at) = entry.value();
            if *expires_at > Instant::now() {
                return Some(value.clone());
            }
            true
        };

        if expired {
            self.entries
                .remove_if(key, |_, (_, expires_at)| *expires_at <= Instant::now());
        }
        None
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.live_value(key).is_some();
        self.entries.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_value(key).is_some())
    }
}
