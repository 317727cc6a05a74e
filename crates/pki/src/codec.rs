//! PEM 编解码
//!
//! 三类产物共用同一套编解码，以 PEM 标签区分。解码时标签必须与期望一致，
//! 不一致视为格式错误而非警告。

use crate::error::{PkiError, PkiResult};
use pem::{EncodeConfig, LineEnding, Pem};

/// PEM 产物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemKind {
    /// SEC1 椭圆曲线私钥
    PrivateKey,
    /// PKCS#10 证书签名请求
    CertificateRequest,
    /// X.509 证书
    Certificate,
}

impl PemKind {
    /// PEM 块标签
    pub const fn label(self) -> &'static str {
        match self {
            Self::PrivateKey => "EC PRIVATE KEY",
            Self::CertificateRequest => "CERTIFICATE REQUEST",
            Self::Certificate => "CERTIFICATE",
        }
    }
}

impl std::fmt::Display for PemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 将 DER 字节编码为 PEM 文本（LF 换行）
pub fn encode(der: &[u8], kind: PemKind) -> String {
    let block = Pem::new(kind.label(), der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// 解码 PEM 文本并校验标签，返回 DER 字节
pub fn decode(pem_text: &str, kind: PemKind) -> PkiResult<Vec<u8>> {
    let block = pem::parse(pem_text)
        .map_err(|e| PkiError::Format(format!("could not find a PEM block: {e}")))?;

    if block.tag() != kind.label() {
        return Err(PkiError::Format(format!(
            "PEM block is not of type {kind} (found {})",
            block.tag()
        )));
    }

    Ok(block.into_contents())
}
