//! 身份校验
//!
//! 签发逻辑只依赖 [`IdentityVerifier`]，替换为真实身份库时无需改动签发流程。

use sess_common::config::AuthConfig;
use subtle::ConstantTimeEq;

/// 用户名/口令校验能力
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// 单一静态账号
#[derive(Clone)]
pub struct StaticIdentityVerifier {
    username: String,
    password: String,
}

impl StaticIdentityVerifier {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl From<&AuthConfig> for StaticIdentityVerifier {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

/// 内置演示账号
impl Default for StaticIdentityVerifier {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl IdentityVerifier for StaticIdentityVerifier {
    fn verify(&self, username: &str, password: &str) -> bool {
        // 两项都比较完，避免按用户名短路
        let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let pass_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        (user_ok & pass_ok).into()
    }
}

impl std::fmt::Debug for StaticIdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentityVerifier")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
