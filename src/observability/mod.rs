//! 可观测性模块
//!
//! 提供 Prometheus 指标、结构化日志和健康检查。

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config::LoggingConfig;
use crate::storage::cache::CacheBackend;

// ===== Simple Metrics =====

/// 应用指标
#[derive(Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_request_duration_sum: AtomicU64,
    pub queries_total: AtomicU64,
    pub fallback_answers_total: AtomicU64,
    pub sessions_created_total: AtomicU64,
    pub ws_connections_active: AtomicUsize,
    pub errors_total: AtomicU64,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64, is_error: bool) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
        if is_error {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录一次查询，`fallback` 表示返回了兜底回答
    pub fn record_query(&self, fallback: bool) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        if fallback {
            self.fallback_answers_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_session_created(&self) {
        self.sessions_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ws_connected(&self) {
        self.ws_connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ws_disconnected(&self) {
        // 不会低于 0
        let _ = self.ws_connections_active.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |n| n.checked_sub(1),
        );
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds summary
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
# HELP chat_queries_total Total chat queries processed
# TYPE chat_queries_total counter
chat_queries_total {}
# HELP chat_fallback_answers_total Queries answered with the fallback sentence
# TYPE chat_fallback_answers_total counter
chat_fallback_answers_total {}
# HELP sessions_created_total Total sessions created
# TYPE sessions_created_total counter
sessions_created_total {}
# HELP ws_connections_active Open WebSocket connections
# TYPE ws_connections_active gauge
ws_connections_active {}
# HELP errors_total Total HTTP error responses
# TYPE errors_total counter
errors_total {}
"#,
            self.http_requests_total.load(Ordering::Relaxed),
            self.http_request_duration_sum.load(Ordering::Relaxed) as f64 / 1000.0,
            self.http_requests_total.load(Ordering::Relaxed),
            self.queries_total.load(Ordering::Relaxed),
            self.fallback_answers_total.load(Ordering::Relaxed),
            self.sessions_created_total.load(Ordering::Relaxed),
            self.ws_connections_active.load(Ordering::Relaxed),
            self.errors_total.load(Ordering::Relaxed),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    pub message: String,
    pub latency_ms: u64,
}

impl From<&HealthCheckResult> for HealthCheck {
    fn from(result: &HealthCheckResult) -> Self {
        Self {
            name: result.name.clone(),
            status: status_label(result.healthy).to_string(),
            message: Some(result.message.clone()),
            latency_ms: Some(result.latency_ms),
        }
    }
}

fn status_label(healthy: bool) -> &'static str {
    if healthy { "healthy" } else { "unhealthy" }
}

/// 可观测性状态
pub struct ObservabilityState {
    pub metrics: AppMetrics,
    pub health_checks: Mutex<Vec<HealthCheckResult>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
    cache: Option<Arc<dyn CacheBackend>>,
}

impl ObservabilityState {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            metrics: AppMetrics::default(),
            health_checks: Mutex::new(Vec::new()),
            start_time: Utc::now(),
            version: version.into(),
            cache: None,
        }
    }

    /// 就绪检查时探测缓存后端
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 添加健康检查结果，只保留最近 10 条
    pub async fn add_health_check(&self, result: HealthCheckResult) {
        let mut checks = self.health_checks.lock().await;
        checks.push(result);
        if checks.len() > 10 {
            checks.remove(0);
        }
    }

    /// 探测缓存后端并记录结果
    pub async fn check_cache(&self) -> bool {
        let Some(cache) = &self.cache else {
            return true;
        };

        let start = Instant::now();
        let (healthy, message) = match cache.ping().await {
            Ok(()) => (true, "Connected".to_string()),
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                (false, e.to_string())
            }
        };

        self.add_health_check(HealthCheckResult {
            name: "cache".to_string(),
            healthy,
            message,
            latency_ms: start.elapsed().as_millis() as u64,
        })
        .await;
        healthy
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    state.check_cache().await;

    let checks = state.health_checks.lock().await;
    // 每个检查项只看最近一次结果
    let mut latest: Vec<&HealthCheckResult> = Vec::new();
    for check in checks.iter().rev() {
        if !latest.iter().any(|c| c.name == check.name) {
            latest.push(check);
        }
    }
    let all_healthy = latest.iter().all(|c| c.healthy);

    let health_status = HealthStatus {
        status: status_label(all_healthy).to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: latest.into_iter().map(HealthCheck::from).collect(),
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查（探测缓存后端）
pub async fn readiness(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    if state.check_cache().await {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外按天滚动写文件，
/// 返回的 guard 需要保持到进程结束。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "newsdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    let result = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already initialized: {}", e);
    }

    guard
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    State(state): State<Arc<ObservabilityState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let is_error = response.status().is_server_error() || response.status().is_client_error();
    state.metrics.record_http_request(duration_ms, is_error);

    response
}
