//! 登录与客户端错误定义

use crate::login::LoginStage;
use pki::PkiError;
use thiserror::Error;
use tonic::Status;
use tracing::error;

/// 登录请求被拒绝的原因
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("a CSR is required")]
    MissingCsr,

    #[error("username and password are required")]
    MissingCredentials,

    #[error("incorrect username or password")]
    InvalidCredentials,

    /// CSR 校验或证书签发失败
    #[error(transparent)]
    Authority(#[from] PkiError),
}

impl LoginError {
    /// 被拒绝前最后到达的阶段
    pub fn stage(&self) -> LoginStage {
        match self {
            Self::MissingCsr | Self::MissingCredentials | Self::InvalidCredentials => {
                LoginStage::Received
            }
            Self::Authority(e) if e.is_caller_fault() => LoginStage::CredentialsChecked,
            Self::Authority(_) => LoginStage::CsrValidated,
        }
    }
}

impl From<LoginError> for Status {
    fn from(err: LoginError) -> Self {
        match &err {
            LoginError::Authority(e) if e.is_caller_fault() => {
                Status::invalid_argument(format!("invalid CSR: {e}"))
            }
            LoginError::Authority(e) => {
                error!("Certificate issuance failed: {}", e);
                Status::internal("failed to issue certificate")
            }
            _ => Status::invalid_argument(err.to_string()),
        }
    }
}

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("RPC failed: {}", .0.message())]
    Rpc(#[from] Box<Status>),

    #[error("PKI error: {0}")]
    Pki(#[from] PkiError),
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        Self::Rpc(Box::new(status))
    }
}

impl ClientError {
    /// RPC 状态码（仅 RPC 错误有）
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            Self::Rpc(status) => Some(status.code()),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
