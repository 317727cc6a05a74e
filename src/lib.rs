//! # tls-sessions
//!
//! 口令登录换取短期客户端证书，再凭证书通过 mTLS 访问受保护服务

pub mod service;

// Re-export commonly used types
pub use sess_common::config::SessConfig;
pub use service::{AuthGrpcServer, ProtectedGrpcServer};
