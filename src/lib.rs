//! Newsdesk - 新闻对话检索增强服务
//!
//! 以会话为单位保存对话历史，结合向量检索到的新闻文章和近期对话
//! 组装提示词，由托管大模型生成回答。

pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
pub mod websocket;
