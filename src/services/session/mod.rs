//! 会话服务
//!
//! 会话令牌到消息历史的映射，带滑动过期时间。会话历史只保存在缓存后端中。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::chat::ChatMessage;
use crate::storage::cache::CacheBackend;

/// 默认会话过期时间
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// 会话在缓存中的键
pub fn history_key(token: &str) -> String {
    format!("session:{}:history", token)
}

/// 会话存储 trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 创建会话，返回新令牌
    async fn create(&self) -> Result<String>;

    /// 会话是否存在且未过期
    async fn exists(&self, token: &str) -> Result<bool>;

    /// 获取完整消息历史
    async fn get_history(&self, token: &str) -> Result<Vec<ChatMessage>>;

    /// 追加一条消息并刷新过期时间
    async fn append(&self, token: &str, message: ChatMessage) -> Result<()>;

    /// 立即删除会话
    async fn clear(&self, token: &str) -> Result<()>;
}

/// 基于缓存后端的会话存储
///
/// 同一令牌上的读-改-写由进程内的令牌级互斥锁串行化，
/// 多进程共享同一 Redis 时仍可能丢失并发追加。
pub struct CacheSessionStore {
    cache: Arc<dyn CacheBackend>,
    ttl: Duration,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheSessionStore {
    /// 创建新的会话存储
    pub fn new(cache: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            locks: DashMap::new(),
        }
    }

    /// 使用默认过期时间
    pub fn with_default_ttl(cache: Arc<dyn CacheBackend>) -> Self {
        Self::new(cache, DEFAULT_SESSION_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn token_lock(&self, token: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(token.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release_lock(&self, token: &str) {
        self.locks
            .remove_if(token, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn write_history(&self, token: &str, history: &[ChatMessage]) -> Result<()> {
        let payload = serde_json::to_string(history)?;
        self.cache
            .set_with_ttl(&history_key(token), &payload, self.ttl)
            .await
    }

    async fn read_history(&self, token: &str) -> Result<Vec<ChatMessage>> {
        let raw = self
            .cache
            .get(&history_key(token))
            .await?
            .ok_or_else(AppError::session_not_found)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn create(&self) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.write_history(&token, &[]).await?;
        debug!("Created session {}", token);
        Ok(token)
    }

    async fn exists(&self, token: &str) -> Result<bool> {
        self.cache.exists(&history_key(token)).await
    }

    async fn get_history(&self, token: &str) -> Result<Vec<ChatMessage>> {
        self.read_history(token).await
    }

    async fn append(&self, token: &str, message: ChatMessage) -> Result<()> {
        let lock = self.token_lock(token);
        let result = {
            let _guard = lock.lock().await;
            match self.read_history(token).await {
                Ok(mut history) => {
                    history.push(message);
                    self.write_history(token, &history).await
                }
                Err(e) => Err(e),
            }
        };
        drop(lock);
        self.release_lock(token);
        result
    }

    async fn clear(&self, token: &str) -> Result<()> {
        let lock = self.token_lock(token);
        let removed = {
            let _guard = lock.lock().await;
            self.cache.delete(&history_key(token)).await
        };
        drop(lock);
        self.release_lock(token);

        if removed? {
            debug!("Cleared session {}", token);
            Ok(())
        } else {
            Err(AppError::session_not_found())
        }
    }
}

/// 创建会话存储
pub fn create_session_store(cache: Arc<dyn CacheBackend>, ttl: Duration) -> Box<dyn SessionStore> {
    Box::new(CacheSessionStore::new(cache, ttl))
}
