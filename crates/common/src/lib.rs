//! 会话服务通用基础设施
//!
//! 目前只包含 TOML 配置的定义、加载与校验。

pub mod config;

pub use config::SessConfig;
