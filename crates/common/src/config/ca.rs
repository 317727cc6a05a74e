use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// CA 材料与证书有效期配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaConfig {
    /// CA 私钥路径，不存在时生成
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// CA 根证书路径，不存在时自签
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,

    /// 会话客户端证书有效期（秒），默认 7 天
    #[serde(default = "default_user_cert_ttl_secs")]
    pub user_cert_ttl_secs: u64,

    /// 网关服务端证书有效期（秒），默认 1 年
    #[serde(default = "default_server_cert_ttl_secs")]
    pub server_cert_ttl_secs: u64,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
            cert_path: default_cert_path(),
            user_cert_ttl_secs: default_user_cert_ttl_secs(),
            server_cert_ttl_secs: default_server_cert_ttl_secs(),
        }
    }
}

impl CaConfig {
    pub fn user_cert_ttl(&self) -> Duration {
        Duration::from_secs(self.user_cert_ttl_secs)
    }

    pub fn server_cert_ttl(&self) -> Duration {
        Duration::from_secs(self.server_cert_ttl_secs)
    }
}

fn default_key_path() -> PathBuf {
    PathBuf::from("certs/ca_key.pem")
}

fn default_cert_path() -> PathBuf {
    PathBuf::from("certs/ca_cert.pem")
}

fn default_user_cert_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_server_cert_ttl_secs() -> u64 {
    365 * 24 * 60 * 60
}
