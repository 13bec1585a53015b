use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 允许跨域
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_permissive: true,
        }
    }
}

/// 会话缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 缓存后端: "memory" 或 "redis"
    pub backend: String,
    /// Redis 地址
    pub redis_url: String,
    /// 会话过期时间（秒），每次写入后刷新
    pub session_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "memory".into(),
            redis_url: String::new(),
            session_ttl_secs: 3600,
        }
    }
}

/// 向量索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// 向量维度
    pub dimension: usize,
    /// 启动时载入的新闻文档（JSON 数组）
    pub seed_path: Option<PathBuf>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            seed_path: None,
        }
    }
}

/// 嵌入模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding 后端类型: "gemini", "ollama" 或 "hashing"
    pub backend: String,
    /// 模型名称
    pub model_name: String,
    /// Ollama 服务器地址
    pub ollama_url: String,
    /// Gemini API 地址
    pub gemini_url: String,
    /// API 密钥（Gemini）
    pub api_key: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hashing".into(),
            model_name: "nomic-embed-text".into(),
            ollama_url: "http://localhost:11434".into(),
            gemini_url: "https://generativelanguage.googleapis.com".into(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

/// 新闻源导入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 启动时是否导入 RSS
    pub enabled: bool,
    /// RSS 地址
    pub rss_feed_url: String,
    /// 最多导入的条目数
    pub max_articles: usize,
    /// 分块长度（字符）
    pub chunk_size: usize,
    /// 相邻分块重叠（字符）
    pub chunk_overlap: usize,
    /// 下载超时（秒）
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rss_feed_url: "http://feeds.bbci.co.uk/news/rss.xml".into(),
            max_articles: 50,
            chunk_size: 1000,
            chunk_overlap: 100,
            timeout_secs: 30,
        }
    }
}

/// 语言模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// 后端: "gemini", "ollama" 或 "echo"
    pub backend: String,
    /// 模型名称
    pub model: String,
    /// API 地址
    pub base_url: String,
    /// API 密钥（Gemini）
    pub api_key: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "echo".into(),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 会话缓存配置
    pub cache: CacheConfig,
    /// 向量索引配置
    pub vector: VectorConfig,
    /// 嵌入模型配置
    pub embedding: EmbeddingConfig,
    /// 新闻源导入配置
    pub ingest: IngestConfig,
    /// 语言模型配置
    pub llm: LlmConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            vector: VectorConfig::default(),
            embedding: EmbeddingConfig::default(),
            ingest: IngestConfig::default(),
            llm: LlmConfig::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                ..LoggingConfig::default()
            },
            app_name: "newsdesk".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.cache.backend = "redis".into();
        config.cache.redis_url = "redis://localhost:6379".into();
        config.llm.backend = "gemini".into();
        config.embedding.backend = "gemini".into();
        config.embedding.model_name = "text-embedding-004".into();
        config.vector.dimension = 768;
        config
    }
}
