//! 服务模块

pub mod history;
pub mod prompt;
pub mod query;
pub mod retrieval;
pub mod session;

pub use history::{HISTORY_WINDOW, format_history};
pub use prompt::compose_prompt;
pub use query::{FALLBACK_ANSWER, PipelineStage, QueryOutcome, QueryPipeline};
pub use retrieval::{QueryKind, RetrievalSelector};
pub use session::{CacheSessionStore, SessionStore, create_session_store};
