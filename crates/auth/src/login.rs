//! 登录签发流程
//!
//! 单个请求依次经过 `Received → CredentialsChecked → CsrValidated →
//! CertificateIssued`，任一关口失败即终止为 `Rejected`，不产生任何证书。

use crate::error::LoginError;
use crate::verifier::IdentityVerifier;
use pki::CertificateAuthority;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 登录处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Received,
    CredentialsChecked,
    CsrValidated,
    CertificateIssued,
    Rejected,
}

/// 一次登录请求
#[derive(Clone, Default)]
pub struct LoginAttempt {
    pub username: String,
    pub password: String,
    /// PEM 编码的 CSR
    pub csr: String,
}

impl std::fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("csr_len", &self.csr.len())
            .finish()
    }
}

/// 登录成功后返回给客户端的材料
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub cert_pem: String,
    pub anchor_pem: String,
}

/// 口令 + CSR 换取客户端证书
#[derive(Clone)]
pub struct LoginAuthenticator {
    authority: Arc<CertificateAuthority>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl LoginAuthenticator {
    pub fn new(authority: Arc<CertificateAuthority>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            authority,
            verifier,
        }
    }

    pub fn authority(&self) -> &CertificateAuthority {
        &self.authority
    }

    /// 处理一次登录
    ///
    /// CSR 缺失在口令检查之前判定。
    pub fn login(&self, attempt: &LoginAttempt) -> Result<IssuedCredentials, LoginError> {
        self.process(attempt).inspect_err(|e| {
            debug!(
                stage = ?LoginStage::Rejected,
                last_stage = ?e.stage(),
                "Login rejected: {}",
                e
            );
        })
    }

    fn process(&self, attempt: &LoginAttempt) -> Result<IssuedCredentials, LoginError> {
        debug!(stage = ?LoginStage::Received, "Login request");

        if attempt.csr.is_empty() {
            return Err(LoginError::MissingCsr);
        }
        if attempt.username.is_empty() || attempt.password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        info!(
            username = %attempt.username,
            password = "[REDACTED]",
            csr_bytes = attempt.csr.len(),
            "Login request received"
        );

        if !self.verifier.verify(&attempt.username, &attempt.password) {
            warn!(username = %attempt.username, "Login failed: incorrect username or password");
            return Err(LoginError::InvalidCredentials);
        }
        debug!(stage = ?LoginStage::CredentialsChecked, "Credentials accepted");

        // sign 内部先完成 CSR 校验，再签发
        let cert_pem = self.authority.sign(&attempt.csr)?;
        debug!(stage = ?LoginStage::CertificateIssued, "Certificate issued");

        info!(username = %attempt.username, "✅ Login succeeded, client certificate issued");
        Ok(IssuedCredentials {
            cert_pem,
            anchor_pem: self.authority.anchor_pem().to_string(),
        })
    }
}

impl std::fmt::Debug for LoginAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAuthenticator")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}
