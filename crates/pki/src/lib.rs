//! 私有证书颁发机构 (CA)
//!
//! 提供会话证书签发所需的全部 PKI 能力：
//!
//! - [`PrivateKey`]: P-256 密钥生成与 PEM 持久化
//! - [`codec`]: 按标签区分的 PEM 编解码
//! - [`new_csr`] / [`CertificateRequest`]: CSR 生成与自签名校验
//! - [`CertificateAuthority`]: 根证书自签、CSR 签发客户端证书、网关服务端证书
//! - [`CaStore`]: CA 密钥与根证书的加载或生成

pub mod authority;
pub mod certificate;
pub mod codec;
pub mod error;
pub mod keys;
pub mod request;
pub mod store;

pub use authority::{
    CertificateAuthority, DEFAULT_USER_CERT_TTL, ROOT_VALIDITY_YEARS, ServerIdentity, self_sign,
    sign_csr,
};
pub use certificate::{CertificateDetails, ExtendedKeyUsage, KeyUsage, verify_issued_by};
pub use codec::PemKind;
pub use error::{PkiError, PkiResult};
pub use keys::PrivateKey;
pub use request::{CertificateRequest, new_csr};
pub use store::{CaStore, load_cert, save_cert};
