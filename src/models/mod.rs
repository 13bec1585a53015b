//! 核心数据模型模块
//!
//! 定义会话消息与检索文档等核心数据结构。

pub mod chat;
pub mod document;

pub use chat::*;
pub use document::*;
