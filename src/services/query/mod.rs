//! 查询流水线
//!
//! 校验会话 → 记录用户消息 → 检索 → 组装提示词 → 生成 → 记录回答。
//! 会话无效时返回 NotFound，其余失败都转换为固定的兜底回答。

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::llm::LanguageModel;
use crate::models::chat::ChatMessage;
use crate::services::history::format_history;
use crate::services::prompt::compose_prompt;
use crate::services::retrieval::RetrievalSelector;
use crate::services::session::SessionStore;

/// 处理失败时返回给用户的回答
pub const FALLBACK_ANSWER: &str = "Sorry, an error occurred while processing your query.";

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Retrieving,
    Composing,
    Generating,
    Recording,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Validating => "validating",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Composing => "composing",
            PipelineStage::Generating => "generating",
            PipelineStage::Recording => "recording",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// 一次查询的结果
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// 返回给用户的回答
    pub answer: String,
    /// 失败发生的阶段；成功时为 None
    pub failed_at: Option<PipelineStage>,
    /// 回答是否已写入会话历史
    pub recorded: bool,
}

impl QueryOutcome {
    /// 是否为兜底回答
    pub fn is_fallback(&self) -> bool {
        self.failed_at.is_some()
    }
}

/// 查询流水线
#[derive(Clone)]
pub struct QueryPipeline {
    sessions: Arc<dyn SessionStore>,
    retrieval: RetrievalSelector,
    model: Arc<dyn LanguageModel>,
}

impl QueryPipeline {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        retrieval: RetrievalSelector,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            sessions,
            retrieval,
            model,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// 处理一条查询
    ///
    /// 只有会话不存在（或在记录用户消息前过期）时返回 `Err(NotFound)`。
    pub async fn process(&self, token: &str, query: &str) -> Result<QueryOutcome> {
        let generated = match self.validate_and_record_query(token, query).await {
            Ok(()) => self.generate(token, query).await,
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => Err((PipelineStage::Validating, e)),
        };

        let (answer, failed_at) = match generated {
            Ok(answer) => (answer, None),
            Err((stage, e)) => {
                error!("Query pipeline failed while {}: {}", stage, e);
                (FALLBACK_ANSWER.to_string(), Some(stage))
            }
        };

        // 会话可能在生成期间过期，此时回答照常返回，历史中缺少这一条
        let recorded = match self.sessions.append(token, ChatMessage::bot(&answer)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to record answer for session {} while {}: {}",
                    token,
                    PipelineStage::Recording,
                    e
                );
                false
            }
        };

        debug!("Query pipeline {} for session {}", PipelineStage::Done, token);
        Ok(QueryOutcome {
            answer,
            failed_at,
            recorded,
        })
    }

    async fn validate_and_record_query(&self, token: &str, query: &str) -> Result<()> {
        if !self.sessions.exists(token).await? {
            return Err(AppError::session_not_found());
        }
        self.sessions.append(token, ChatMessage::user(query)).await
    }

    async fn generate(
        &self,
        token: &str,
        query: &str,
    ) -> std::result::Result<String, (PipelineStage, AppError)> {
        let documents = self
            .retrieval
            .retrieve(query)
            .await
            .map_err(|e| (PipelineStage::Retrieving, e))?;

        let history = self
            .sessions
            .get_history(token)
            .await
            .map_err(|e| (PipelineStage::Composing, e))?;
        info!(
            "Session {}: {} messages in history, {} documents retrieved",
            token,
            history.len(),
            documents.len()
        );

        let prompt = compose_prompt(&format_history(&history), &documents, query);

        self.model
            .generate(&prompt)
            .await
            .map_err(|e| (PipelineStage::Generating, e))
    }
}
