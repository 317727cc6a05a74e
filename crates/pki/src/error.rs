//! PKI 错误定义

use std::path::PathBuf;
use thiserror::Error;

/// PKI 操作错误类型
#[derive(Error, Debug)]
pub enum PkiError {
    /// PEM 块缺失或标签不匹配
    #[error("Format error: {0}")]
    Format(String),

    /// DER 内部结构无法解析
    #[error("Parse error: {0}")]
    Parse(String),

    /// CSR 自签名无法用其内嵌公钥验证
    #[error("CSR signature is invalid: {0}")]
    SignatureInvalid(String),

    /// 随机源或算法失败，不可重试
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// 证书构造或签名失败
    #[error("Signing error: {0}")]
    Signing(String),

    /// CA 证书与签名私钥不匹配
    #[error("CA certificate does not belong to the signing key")]
    KeyMismatch,

    /// 文件读写错误
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PkiError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 是否由请求方提交的数据引起（而非 CA 自身故障）
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::Parse(_) | Self::SignatureInvalid(_)
        )
    }
}

/// PKI Result 类型别名
pub type PkiResult<T> = Result<T, PkiError>;
