//! 新闻源导入
//!
//! 下载 RSS，取前 `max_articles` 条，摘要为空时退回正文，两者都为空的条目跳过。
//! 文本按字符切成带重叠的分块后整体替换索引内容。

use feed_rs::parser;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::config::IngestConfig;
use crate::error::{AppError, Result};
use crate::index::NewsIndex;
use crate::models::document::RetrievedDocument;

/// RSS 导入器
pub struct FeedIngester {
    client: reqwest::Client,
    feed_url: String,
    max_articles: usize,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FeedIngester {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            feed_url: config.rss_feed_url.clone(),
            max_articles: config.max_articles,
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
        })
    }

    /// 下载并解析新闻源，返回未分块的文章
    pub async fn fetch_articles(&self) -> Result<Vec<RetrievedDocument>> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| AppError::Ingestion(format!("Failed to fetch {}: {}", self.feed_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Ingestion(format!(
                "Feed {} returned {}",
                self.feed_url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Ingestion(format!("Failed to read feed body: {}", e)))?;
        parse_articles(&body, self.max_articles)
    }

    /// 下载、分块并替换索引内容，返回写入的分块数
    pub async fn ingest(&self, index: &NewsIndex) -> Result<usize> {
        let articles = self.fetch_articles().await?;
        if articles.is_empty() {
            return Err(AppError::Ingestion(format!(
                "Feed {} has no usable entries",
                self.feed_url
            )));
        }

        let article_count = articles.len();
        let chunks = chunk_documents(articles, self.chunk_size, self.chunk_overlap);
        debug!(
            "Split {} articles into {} chunks",
            article_count,
            chunks.len()
        );

        let count = index.replace_documents(chunks).await?;
        info!(
            "Ingested {} chunks from {} articles ({})",
            count, article_count, self.feed_url
        );
        Ok(count)
    }
}

/// 解析 RSS/Atom 文档
pub fn parse_articles(body: &[u8], max_articles: usize) -> Result<Vec<RetrievedDocument>> {
    let feed = parser::parse(body)
        .map_err(|e| AppError::Ingestion(format!("Invalid feed document: {}", e)))?;

    let articles = feed
        .entries
        .into_iter()
        .take(max_articles)
        .filter_map(|entry| {
            let summary = entry
                .summary
                .map(|text| text.content)
                .filter(|text| !text.trim().is_empty());
            let content = summary.or_else(|| {
                entry
                    .content
                    .and_then(|c| c.body)
                    .filter(|body| !body.trim().is_empty())
            })?;

            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let link = entry
                .links
                .into_iter()
                .next()
                .map(|l| l.href)
                .unwrap_or_default();
            Some(RetrievedDocument::new(title, link, content))
        })
        .collect();

    Ok(articles)
}

/// 每篇文章切成若干分块，分块继承标题和链接
pub fn chunk_documents(
    documents: Vec<RetrievedDocument>,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<RetrievedDocument> {
    documents
        .into_iter()
        .flat_map(|document| {
            split_text(&document.content, chunk_size, chunk_overlap)
                .into_iter()
                .map(move |chunk| {
                    RetrievedDocument::new(document.title.clone(), document.link.clone(), chunk)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// 按字符切分文本
///
/// 分块最长 `chunk_size` 个字符，相邻分块重叠 `chunk_overlap` 个字符。
/// 窗口后半段有空白时在最后一个空白处断开。
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    if chars.len() <= chunk_size {
        return vec![chars.iter().collect()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            let floor = start + chunk_size / 2;
            if let Some(pos) = chars[floor..end].iter().rposition(|c| c.is_whitespace()) {
                end = floor + pos;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }
        let next = end.saturating_sub(chunk_overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VectorIndex;
    use crate::index::embedding::HashingEmbeddingModel;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Test News</title>
    <link>https://news.example/</link>
    <description>Top stories</description>
    {}
  </channel>
</rss>"#,
            items
        )
    }

    fn item(n: usize) -> String {
        format!(
            "<item><title>Story {n}</title><link>https://news.example/{n}</link>\
             <description>Summary of story {n}</description></item>"
        )
    }

    fn config(url: String) -> IngestConfig {
        IngestConfig {
            rss_feed_url: url,
            ..IngestConfig::default()
        }
    }

    async fn serve(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/rss.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/rss+xml")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_parse_uses_description_and_skips_empty_entries() {
        let body = rss(
            r#"<item><title>Storm</title><link>https://news.example/storm</link>
                 <description>Storm makes landfall overnight.</description></item>
               <item><title>Empty</title><link>https://news.example/empty</link></item>
               <item><title>Full</title><link>https://news.example/full</link>
                 <content:encoded>Full text of the story.</content:encoded></item>"#,
        );

        let articles = parse_articles(body.as_bytes(), 50).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(
            articles[0],
            RetrievedDocument::new(
                "Storm",
                "https://news.example/storm",
                "Storm makes landfall overnight."
            )
        );
        assert_eq!(articles[1].content, "Full text of the story.");
    }

    #[test]
    fn test_parse_rejects_non_feed() {
        assert!(matches!(
            parse_articles(b"<html>not a feed</html>", 50),
            Err(AppError::Ingestion(_))
        ));
    }

    #[test]
    fn test_split_text_short_text_is_one_chunk() {
        assert_eq!(split_text("  short story  ", 1000, 100), vec!["short story"]);
        assert!(split_text("   ", 1000, 100).is_empty());
    }

    #[test]
    fn test_split_text_overlaps_and_respects_size() {
        let words: Vec<String> = (0..400).map(|i| format!("word{:03}", i)).collect();
        let text = words.join(" ");

        let chunks = split_text(&text, 1000, 100);
        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));

        // 相邻分块共享边界处的词
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].contains(last_word));
        }
        assert!(chunks[0].starts_with("word000"));
        assert!(chunks.last().unwrap().ends_with("word399"));
    }

    #[test]
    fn test_split_text_handles_multibyte_without_whitespace() {
        let text = "新".repeat(2500);
        let chunks = split_text(&text, 1000, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 1000);
        assert_eq!(chunks[2].chars().count(), 700);
    }

    #[tokio::test]
    async fn test_ingest_takes_first_fifty_entries() {
        let items: String = (0..60).map(item).collect();
        let server = serve(rss(&items)).await;

        let ingester =
            FeedIngester::new(&config(format!("{}/news/rss.xml", server.uri()))).unwrap();
        let articles = ingester.fetch_articles().await.unwrap();
        assert_eq!(articles.len(), 50);
        assert_eq!(articles[0].title, "Story 0");
        assert_eq!(articles[49].link, "https://news.example/49");
    }

    #[tokio::test]
    async fn test_ingest_replaces_index_content() {
        let server = serve(rss(&(0..3).map(item).collect::<String>())).await;
        let index = NewsIndex::new(Box::new(HashingEmbeddingModel::new(128)));
        index
            .add_documents(vec![RetrievedDocument::new(
                "Stale",
                "https://old.example/stale",
                "stale story from a previous run",
            )])
            .await
            .unwrap();

        let ingester =
            FeedIngester::new(&config(format!("{}/news/rss.xml", server.uri()))).unwrap();
        assert_eq!(ingester.ingest(&index).await.unwrap(), 3);
        assert_eq!(index.len(), 3);

        let results = index.similarity_search("story", 10).await.unwrap();
        assert!(results.iter().all(|d| d.link.starts_with("https://news.example/")));
    }

    #[tokio::test]
    async fn test_ingest_failure_keeps_existing_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let index = NewsIndex::new(Box::new(HashingEmbeddingModel::new(64)));
        index
            .add_documents(vec![RetrievedDocument::new("Kept", "https://x/kept", "kept")])
            .await
            .unwrap();

        let ingester =
            FeedIngester::new(&config(format!("{}/news/rss.xml", server.uri()))).unwrap();
        assert!(matches!(
            ingester.ingest(&index).await,
            Err(AppError::Ingestion(_))
        ));
        assert_eq!(index.len(), 1);
    }
}
