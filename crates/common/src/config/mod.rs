//! 统一配置管理
//!
//! 所有配置项的定义、默认值与校验都集中在这里。
//! 配置文件使用 TOML 格式，缺省的段落使用默认值。

pub mod auth;
pub mod bind;
pub mod ca;

pub use crate::config::auth::AuthConfig;
pub use crate::config::bind::BindConfig;
pub use crate::config::ca::CaConfig;
use serde::{Deserialize, Serialize};

/// 根证书有效期上限（秒），客户端证书不应比根证书活得更久
const ROOT_LIFETIME_SECS: u64 = 5 * 365 * 24 * 60 * 60;

/// 会话服务主配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessConfig {
    /// 实例名称
    ///
    /// 同时作为 CA 根证书的 CN 与网关服务端证书的 DNS 名称，
    /// 客户端以此名称校验服务端证书。
    #[serde(default = "default_name")]
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境
    /// - "prod": 生产环境，额外检查日志配置
    /// - "test": 测试环境
    #[serde(default = "default_env")]
    pub env: String,

    /// 监听地址
    #[serde(default)]
    pub bind: BindConfig,

    /// CA 材料与证书有效期
    #[serde(default)]
    pub ca: CaConfig,

    /// 登录账号
    #[serde(default)]
    pub auth: AuthConfig,

    /// 可观测性配置（日志）
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,h2=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关（按天），仅 output = "file" 时有效
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录，仅 output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

impl Default for SessConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            env: default_env(),
            bind: BindConfig::default(),
            ca: CaConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_name() -> String {
    "tls-sess-demo".to_string()
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

impl SessConfig {
    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(format!("Configuration file does not exist: {path_ref:?}").into());
        }

        if !path_ref.is_file() {
            return Err(format!("Path is not a valid file: {path_ref:?}").into());
        }

        let content = std::fs::read_to_string(path_ref)?;
        let config: SessConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 以 "Warning:" 开头的条目不阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // 验证实例名称（同时用作证书 DNS 名称）
        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        } else if !is_dns_name(&self.name) {
            errors.push(format!(
                "Invalid instance name '{}': must be a DNS name (letters, digits, '-' and '.')",
                self.name
            ));
        }

        // 验证环境
        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        // 验证过滤级别（EnvFilter 语法）
        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        // 验证日志输出
        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        // 验证监听地址
        let auth_addr = self.bind.auth_addr();
        let protected_addr = self.bind.protected_addr();
        if let Err(e) = &auth_addr {
            errors.push(format!("Invalid bind.auth address '{}': {e}", self.bind.auth));
        }
        if let Err(e) = &protected_addr {
            errors.push(format!(
                "Invalid bind.protected address '{}': {e}",
                self.bind.protected
            ));
        }
        if let (Ok(a), Ok(p)) = (&auth_addr, &protected_addr)
            && a == p
        {
            errors.push(format!(
                "bind.auth and bind.protected must differ (both are {a})"
            ));
        }

        // 验证 CA 配置
        if self.ca.key_path.as_os_str().is_empty() {
            errors.push("ca.key_path cannot be empty".to_string());
        }
        if self.ca.cert_path.as_os_str().is_empty() {
            errors.push("ca.cert_path cannot be empty".to_string());
        }
        if self.ca.key_path == self.ca.cert_path {
            errors.push("ca.key_path and ca.cert_path must be different files".to_string());
        }
        if self.ca.user_cert_ttl_secs == 0 {
            errors.push("ca.user_cert_ttl_secs must be greater than 0".to_string());
        } else if self.ca.user_cert_ttl_secs > ROOT_LIFETIME_SECS {
            errors.push(
                "Warning: ca.user_cert_ttl_secs exceeds the root certificate lifetime (5 years)"
                    .to_string(),
            );
        }
        if self.ca.server_cert_ttl_secs == 0 {
            errors.push("ca.server_cert_ttl_secs must be greater than 0".to_string());
        }

        // 验证登录账号
        if self.auth.username.is_empty() || self.auth.password.is_empty() {
            errors.push("auth.username and auth.password cannot be empty".to_string());
        }
        if self.auth.password == auth::DEMO_PASSWORD {
            errors.push(
                "Warning: auth.password is the built-in demo password. Please change it!"
                    .to_string(),
            );
        }

        // 生产环境额外检查
        if self.env == "prod" {
            if self.observability.log.output == "console" {
                errors.push("Warning: Production environment should use file logging (observability.log.output = \"file\")".to_string());
            }

            if self.observability.log.output == "file" && !self.observability.log.rotate {
                errors.push("Warning: Production environment should enable log rotation (observability.log.rotate = true)".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_dns_name(name: &str) -> bool {
    name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
