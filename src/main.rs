use anyhow::Context;
use newsdesk::api::{self, app_state::AppState};
use newsdesk::config::loader::ConfigLoader;
use newsdesk::index::{FeedIngester, create_news_index};
use newsdesk::llm::create_language_model;
use newsdesk::observability::{ObservabilityState, init_tracing};
use newsdesk::services::{QueryPipeline, RetrievalSelector, create_session_store};
use newsdesk::storage::create_cache_backend;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    ConfigLoader::validate(&config).context("Invalid configuration")?;

    let _log_guard = init_tracing(&config.logging);
    info!(
        "Starting {} ({} environment)...",
        config.app_name, config.environment
    );

    let cache = create_cache_backend(&config.cache).await?;
    info!("Cache backend initialized: {}", config.cache.backend);

    let sessions = Arc::from(create_session_store(
        cache.clone(),
        Duration::from_secs(config.cache.session_ttl_secs),
    ));
    info!(
        "Session store initialized (ttl: {}s)",
        config.cache.session_ttl_secs
    );

    let news_index = create_news_index(&config.vector, &config.embedding).await?;
    if config.ingest.enabled {
        // 导入失败不影响服务启动
        match FeedIngester::new(&config.ingest) {
            Ok(ingester) => {
                if let Err(e) = ingester.ingest(&news_index).await {
                    error!("Failed to ingest {}: {}", config.ingest.rss_feed_url, e);
                }
            }
            Err(e) => error!("Failed to build feed ingester: {}", e),
        }
    }
    if news_index.is_empty() {
        warn!("News index is empty; answers will rely on conversation history only");
    }
    info!(
        "News index initialized: {} documents (embedding backend: {})",
        news_index.len(),
        config.embedding.backend
    );

    let model = Arc::from(create_language_model(&config.llm)?);
    info!(
        "Language model initialized: {} (backend: {})",
        config.llm.model, config.llm.backend
    );

    let pipeline = QueryPipeline::new(
        sessions,
        RetrievalSelector::new(Arc::new(news_index)),
        model,
    );

    let observability = Arc::new(
        ObservabilityState::new(env!("CARGO_PKG_VERSION")).with_cache(cache),
    );
    if !observability.check_cache().await {
        warn!("Cache backend is not reachable yet");
    }

    let app_state = AppState::new(pipeline, observability);
    let router = api::create_router(app_state, &config.server);
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
