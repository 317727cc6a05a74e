use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};

/// 监听地址配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BindConfig {
    /// Auth 服务（明文 gRPC，登录换证书）
    #[serde(default = "default_auth_addr")]
    pub auth: String,

    /// Protected 服务（mTLS gRPC）
    #[serde(default = "default_protected_addr")]
    pub protected: String,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            auth: default_auth_addr(),
            protected: default_protected_addr(),
        }
    }
}

impl BindConfig {
    pub fn auth_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.auth.parse()
    }

    pub fn protected_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.protected.parse()
    }
}

fn default_auth_addr() -> String {
    "127.0.0.1:4443".to_string()
}

fn default_protected_addr() -> String {
    "127.0.0.1:4444".to_string()
}
