//! 存储层模块
//!
//! 提供会话状态的键值缓存后端，支持进程内存与 Redis。

pub mod cache;
pub mod factory;
pub mod redis_cache;

pub use cache::{CacheBackend, MemoryCache};
pub use factory::create_cache_backend;
pub use redis_cache::RedisCache;
