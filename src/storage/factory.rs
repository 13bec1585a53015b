//! 存储工厂模块
//!
//! 根据配置创建相应的缓存后端实例。

use std::sync::Arc;
use std::time::Duration;

use crate::config::config::CacheConfig;
use crate::error::{AppError, Result};
use crate::storage::cache::{CacheBackend, MemoryCache};
use crate::storage::redis_cache::RedisCache;

const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// 根据配置创建缓存后端
pub async fn create_cache_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    match config.backend.as_str() {
        "redis" => {
            if config.redis_url.is_empty() {
                return Err(AppError::Config(
                    "cache.redis_url is required for the redis backend".into(),
                ));
            }
            let cache = RedisCache::connect(&config.redis_url).await?;
            Ok(Arc::new(cache))
        }
        "memory" => {
            let cache = Arc::new(MemoryCache::new());
            cache.spawn_purge_task(MEMORY_PURGE_INTERVAL);
            Ok(cache)
        }
        other => Err(AppError::Config(format!("Unknown cache backend: {}", other))),
    }
}
