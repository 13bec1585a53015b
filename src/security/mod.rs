//! Security Module
//!
//! HTTP response hardening shared by every route.

pub mod middleware;

pub use middleware::security_headers_middleware;
