use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 内置默认值
    /// 2. ./config.toml（或 NEWSDESK_CONFIG 指定的文件）
    /// 3. NEWSDESK_ 前缀环境变量，嵌套字段用 `__` 分隔
    /// 4. 部署环境中约定的 REDIS_URL / GOOGLE_API_KEY / RSS_FEED_URL
    pub fn load() -> Result<AppConfig, figment::Error> {
        let path = std::env::var("NEWSDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(path)
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: PathBuf) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("NEWSDESK_").split("__"))
            .merge(
                Env::raw()
                    .only(&["REDIS_URL"])
                    .map(|_| "cache.redis_url".into()),
            )
            .merge(
                Env::raw()
                    .only(&["GOOGLE_API_KEY"])
                    .map(|_| "llm.api_key".into()),
            )
            .merge(
                Env::raw()
                    .only(&["GOOGLE_API_KEY"])
                    .map(|_| "embedding.api_key".into()),
            )
            .merge(
                Env::raw()
                    .only(&["RSS_FEED_URL"])
                    .map(|_| "ingest.rss_feed_url".into()),
            )
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.cache.session_ttl_secs == 0 {
            return Err(ConfigValidationError::InvalidTtl);
        }

        if config.cache.backend == "redis" && config.cache.redis_url.is_empty() {
            return Err(ConfigValidationError::MissingRedisUrl);
        }

        if config.vector.dimension == 0 {
            return Err(ConfigValidationError::InvalidDimension);
        }

        if config.llm.backend == "gemini" && config.llm.api_key.is_empty() {
            return Err(ConfigValidationError::MissingApiKey);
        }

        if config.embedding.backend == "gemini" && config.embedding.api_key.is_empty() {
            return Err(ConfigValidationError::MissingApiKey);
        }

        if config.ingest.enabled
            && (config.ingest.chunk_size == 0
                || config.ingest.chunk_overlap >= config.ingest.chunk_size)
        {
            return Err(ConfigValidationError::InvalidChunking);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("会话过期时间无效，必须大于 0")]
    InvalidTtl,

    #[error("Redis 后端未配置连接 URL")]
    MissingRedisUrl,

    #[error("向量维度无效，必须大于 0")]
    InvalidDimension,

    #[error("Gemini 后端未配置 API 密钥")]
    MissingApiKey,

    #[error("分块参数无效，重叠长度必须小于分块长度")]
    InvalidChunking,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}
