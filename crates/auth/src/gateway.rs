//! 受保护网关的 mTLS 配置
//!
//! 网关只信任 CA 根证书签发的客户端证书；证书链校验由 TLS 层在任何 RPC
//! 分发之前完成。

use pki::{CertificateAuthority, PkiResult, ServerIdentity};
use std::time::Duration;
use tonic::transport::{Certificate, Identity, ServerTlsConfig};
use tracing::info;

/// 以服务端身份与信任锚构建 TLS 配置，客户端证书为必需
pub fn gateway_tls_config(identity: &ServerIdentity, anchor_pem: &str) -> ServerTlsConfig {
    ServerTlsConfig::new()
        .identity(Identity::from_pem(
            identity.cert_pem.as_bytes(),
            identity.key_pem.as_bytes(),
        ))
        .client_ca_root(Certificate::from_pem(anchor_pem))
}

/// 网关 TLS 材料
#[derive(Debug)]
pub struct SessionGateway {
    identity: ServerIdentity,
    anchor_pem: String,
}

impl SessionGateway {
    /// 由 CA 为 `server_name` 签发服务端证书
    pub fn new(
        authority: &CertificateAuthority,
        server_name: &str,
        server_cert_ttl: Duration,
    ) -> PkiResult<Self> {
        let identity = authority.issue_server_identity(server_name, server_cert_ttl)?;
        info!("Session gateway identity ready for {}", server_name);
        Ok(Self {
            identity,
            anchor_pem: authority.anchor_pem().to_string(),
        })
    }

    pub fn tls_config(&self) -> ServerTlsConfig {
        gateway_tls_config(&self.identity, &self.anchor_pem)
    }

    pub fn server_cert_pem(&self) -> &str {
        &self.identity.cert_pem
    }
}
