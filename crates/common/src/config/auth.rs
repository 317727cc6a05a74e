use serde::{Deserialize, Serialize};

/// 内置演示账号，未配置 `[auth]` 时使用
pub const DEMO_USERNAME: &str = "demo";
/// 内置演示口令，校验时给出警告
pub const DEMO_PASSWORD: &str = "password123";

/// 登录账号配置
///
/// 系统只有一个静态账号，不涉及口令哈希或身份库。
#[derive(Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn default_username() -> String {
    DEMO_USERNAME.to_string()
}

fn default_password() -> String {
    DEMO_PASSWORD.to_string()
}
