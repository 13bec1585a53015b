// Integration tests for the chat query pipeline
//
// Everything runs against in-memory backends:
// - MemoryCache for session state
// - NewsIndex with the hashing embedding model
// - A recording language model stub

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use newsdesk::error::{AppError, Result};
use newsdesk::index::embedding::HashingEmbeddingModel;
use newsdesk::index::{NewsIndex, VectorIndex};
use newsdesk::llm::LanguageModel;
use newsdesk::models::{ChatMessage, RetrievedDocument, Role};
use newsdesk::services::history::NO_HISTORY;
use newsdesk::services::prompt::NO_CONTEXT;
use newsdesk::services::{
    CacheSessionStore, FALLBACK_ANSWER, PipelineStage, QueryPipeline, RetrievalSelector,
    SessionStore,
};
use newsdesk::storage::MemoryCache;

/// Remembers every prompt and answers with a fixed sentence
#[derive(Default)]
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Here is what I found.".to_string())
    }
}

struct UnreachableIndex;

#[async_trait]
impl VectorIndex for UnreachableIndex {
    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<RetrievedDocument>> {
        Err(AppError::VectorIndex("connection refused".into()))
    }
}

fn session_store() -> Arc<CacheSessionStore> {
    Arc::new(CacheSessionStore::with_default_ttl(Arc::new(
        MemoryCache::new(),
    )))
}

async fn seeded_index() -> NewsIndex {
    let index = NewsIndex::new(Box::new(HashingEmbeddingModel::new(384)));
    index
        .add_documents(vec![
            RetrievedDocument::new(
                "Storm makes landfall on the coast",
                "https://news.example/storm",
                "The storm made landfall overnight, cutting power to thousands of homes.",
            ),
            RetrievedDocument::new(
                "Central bank leaves rates unchanged",
                "https://news.example/rates",
                "The central bank held interest rates steady for a third month.",
            ),
            RetrievedDocument::new(
                "Championship final goes to extra time",
                "https://news.example/final",
                "The championship final was decided in extra time.",
            ),
        ])
        .await
        .unwrap();
    index
}

#[tokio::test]
async fn test_first_query_with_empty_index() {
    let sessions = session_store();
    let model = Arc::new(RecordingModel::default());
    let pipeline = QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(NewsIndex::new(Box::new(
            HashingEmbeddingModel::new(64),
        )))),
        model.clone(),
    );

    let token = sessions.create().await.unwrap();
    let outcome = pipeline.process(&token, "Hi").await.unwrap();

    assert_eq!(outcome.answer, "Here is what I found.");
    assert_eq!(outcome.failed_at, None);

    let prompt = model.last_prompt();
    assert!(prompt.contains(NO_CONTEXT));
    assert!(!prompt.contains(NO_HISTORY));
    assert!(prompt.contains("Conversation History:\nUser: Hi\n\n"));
}

#[tokio::test]
async fn test_topical_query_brings_news_context() {
    let sessions = session_store();
    let model = Arc::new(RecordingModel::default());
    let pipeline = QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(seeded_index().await)),
        model.clone(),
    );

    let token = sessions.create().await.unwrap();
    pipeline
        .process(&token, "latest news on interest rates")
        .await
        .unwrap();

    let prompt = model.last_prompt();
    assert!(prompt.contains("Title: Central bank leaves rates unchanged"));
    // 新闻类查询 k=5，索引只有 3 篇
    assert_eq!(prompt.matches("Title: ").count(), 3);
}

#[tokio::test]
async fn test_conversational_query_limits_context() {
    let sessions = session_store();
    let model = Arc::new(RecordingModel::default());
    let pipeline = QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(seeded_index().await)),
        model.clone(),
    );

    let token = sessions.create().await.unwrap();
    pipeline.process(&token, "My name is Ada").await.unwrap();
    pipeline.process(&token, "what's my name").await.unwrap();

    let prompt = model.last_prompt();
    assert_eq!(prompt.matches("Title: ").count(), 2);
    assert!(prompt.contains(
        "User: My name is Ada\nBot: Here is what I found.\nUser: what's my name"
    ));
}

#[tokio::test]
async fn test_conversation_is_recorded_in_order() {
    let sessions = session_store();
    let pipeline = QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(seeded_index().await)),
        Arc::new(RecordingModel::default()),
    );

    let token = sessions.create().await.unwrap();
    pipeline.process(&token, "first").await.unwrap();
    pipeline.process(&token, "second").await.unwrap();

    let history = sessions.get_history(&token).await.unwrap();
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Bot, Role::User, Role::Bot]);
    assert_eq!(history[0], ChatMessage::user("first"));
    assert_eq!(history[2], ChatMessage::user("second"));
}

#[tokio::test]
async fn test_unreachable_index_returns_fallback() {
    let sessions = session_store();
    let model = Arc::new(RecordingModel::default());
    let pipeline = QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(UnreachableIndex)),
        model.clone(),
    );

    let token = sessions.create().await.unwrap();
    let outcome = pipeline.process(&token, "latest headlines").await.unwrap();

    assert_eq!(outcome.answer, FALLBACK_ANSWER);
    assert_eq!(outcome.failed_at, Some(PipelineStage::Retrieving));
    assert!(model.prompts.lock().unwrap().is_empty());

    let history = sessions.get_history(&token).await.unwrap();
    assert_eq!(history.last(), Some(&ChatMessage::bot(FALLBACK_ANSWER)));
}

#[tokio::test]
async fn test_cleared_session_is_rejected() {
    let sessions = session_store();
    let pipeline = QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(seeded_index().await)),
        Arc::new(RecordingModel::default()),
    );

    let token = sessions.create().await.unwrap();
    sessions.clear(&token).await.unwrap();

    let err = pipeline.process(&token, "hello again").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!sessions.exists(&token).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_on_one_session_all_recorded() {
    let sessions = session_store();
    let pipeline = Arc::new(QueryPipeline::new(
        sessions.clone(),
        RetrievalSelector::new(Arc::new(seeded_index().await)),
        Arc::new(RecordingModel::default()),
    ));
    let token = sessions.create().await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            let token = token.clone();
            tokio::spawn(async move { pipeline.process(&token, &format!("question {}", i)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = sessions.get_history(&token).await.unwrap();
    assert_eq!(history.len(), 16);
    assert_eq!(history.iter().filter(|m| m.role == Role::User).count(), 8);
}
