//! 会话 gRPC 客户端
//!
//! 登录走明文通道（此时还没有客户端证书），MOTD 走 mTLS 通道。

use crate::error::{ClientError, ClientResult};
use crate::login::IssuedCredentials;
use sess_proto::{AuthClient, LoginRequest, MotdRequest, ProtectedClient};
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tracing::{debug, info};

/// 客户端 mTLS 材料
#[derive(Clone)]
pub struct ClientTls {
    /// 服务端证书中期望的 DNS 名称
    pub server_name: String,
    pub anchor_pem: String,
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for ClientTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTls")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

/// 会话客户端配置
#[derive(Debug, Clone)]
pub struct SessionClientConfig {
    /// 服务地址，如 "127.0.0.1:4443" 或 "https://localhost:4444"
    pub endpoint: String,

    /// 请求超时时间（秒）
    pub timeout_seconds: u64,

    /// 为 None 时使用明文连接
    pub tls: Option<ClientTls>,
}

/// 会话 gRPC 客户端
#[derive(Debug, Clone)]
pub struct SessionClient {
    channel: Channel,
}

impl SessionClient {
    /// 建立连接
    pub async fn connect(config: &SessionClientConfig) -> ClientResult<Self> {
        let uri = normalize_endpoint(&config.endpoint, config.tls.is_some());
        let timeout = Duration::from_secs(config.timeout_seconds);

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| ClientError::Config(format!("Invalid endpoint {uri}: {e}")))?
            .timeout(timeout)
            .connect_timeout(timeout);

        if let Some(tls) = &config.tls {
            endpoint = endpoint.tls_config(Self::build_tls_config(tls))?;
            debug!("mTLS enabled for {}", uri);
        }

        let channel = endpoint.connect().await?;
        info!("Connected to {}", uri);
        Ok(Self { channel })
    }

    fn build_tls_config(tls: &ClientTls) -> ClientTlsConfig {
        ClientTlsConfig::new()
            .domain_name(tls.server_name.clone())
            .ca_certificate(Certificate::from_pem(&tls.anchor_pem))
            .identity(Identity::from_pem(&tls.cert_pem, &tls.key_pem))
    }

    /// 登录，成功时校验返回的证书确由返回的信任锚签发
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        csr_pem: &str,
    ) -> ClientResult<IssuedCredentials> {
        let mut client = AuthClient::new(self.channel.clone());
        let response = client
            .login(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
                csr: csr_pem.to_string(),
            })
            .await?
            .into_inner();

        pki::verify_issued_by(&response.cert, &response.anchors)?;

        Ok(IssuedCredentials {
            cert_pem: response.cert,
            anchor_pem: response.anchors,
        })
    }

    /// 获取公告（需要 mTLS 通道）
    pub async fn motd(&self) -> ClientResult<String> {
        let mut client = ProtectedClient::new(self.channel.clone());
        let response = client.motd(MotdRequest {}).await?.into_inner();
        Ok(response.bulletin)
    }
}

/// 缺少协议头时按是否启用 TLS 补全
fn normalize_endpoint(endpoint: &str, tls: bool) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else if tls {
        format!("https://{endpoint}")
    } else {
        format!("http://{endpoint}")
    }
}
