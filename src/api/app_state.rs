use crate::observability::ObservabilityState;
use crate::services::query::QueryPipeline;
use crate::services::session::SessionStore;
use std::sync::Arc;

/// Application state shared by HTTP handlers and WebSocket connections
#[derive(Clone)]
pub struct AppState {
    /// Session store, the same instance the pipeline records into
    pub sessions: Arc<dyn SessionStore>,
    /// Query pipeline
    pub pipeline: Arc<QueryPipeline>,
    /// Metrics and health checks
    pub observability: Arc<ObservabilityState>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &"Arc<dyn SessionStore>")
            .field("pipeline", &"Arc<QueryPipeline>")
            .field("observability", &self.observability.version)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: QueryPipeline, observability: Arc<ObservabilityState>) -> Self {
        Self {
            sessions: pipeline.sessions().clone(),
            pipeline: Arc::new(pipeline),
            observability,
        }
    }
}
