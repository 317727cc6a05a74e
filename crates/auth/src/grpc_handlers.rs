//! Auth / Protected gRPC 服务实现

use crate::login::{LoginAttempt, LoginAuthenticator};
use pki::CertificateDetails;
use sess_proto::{
    Auth, AuthServer, Bulletin, LoginRequest, LoginResponse, MotdRequest, Protected,
    ProtectedServer,
};
use tonic::{Request, Response, Status};
use tracing::{debug, info};

/// 受保护服务返回的公告
pub const MOTD_BULLETIN: &str = "Hello and welcome!";

/// Auth gRPC 服务状态
#[derive(Clone, Debug)]
pub struct AuthGrpcService {
    authenticator: LoginAuthenticator,
}

impl AuthGrpcService {
    pub fn new(authenticator: LoginAuthenticator) -> Self {
        Self { authenticator }
    }
}

#[tonic::async_trait]
impl Auth for AuthGrpcService {
    /// 口令 + CSR 换取客户端证书
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        debug!("Received gRPC Login request from {:?}", request.remote_addr());

        let req = request.into_inner();
        let attempt = LoginAttempt {
            username: req.username,
            password: req.password,
            csr: req.csr,
        };

        // 验签与签名为 CPU 密集操作，不占用 reactor 线程
        let authenticator = self.authenticator.clone();
        let issued = tokio::task::spawn_blocking(move || authenticator.login(&attempt))
            .await
            .map_err(|e| Status::internal(format!("login task failed: {e}")))??;

        Ok(Response::new(LoginResponse {
            cert: issued.cert_pem,
            anchors: issued.anchor_pem,
        }))
    }
}

/// Protected gRPC 服务
///
/// 访问控制完全由传输层 mTLS 完成，这里没有任何应用层鉴权。
#[derive(Clone, Debug, Default)]
pub struct ProtectedGrpcService;

#[tonic::async_trait]
impl Protected for ProtectedGrpcService {
    async fn motd(&self, request: Request<MotdRequest>) -> Result<Response<Bulletin>, Status> {
        let peer = request
            .peer_certs()
            .and_then(|certs| {
                certs
                    .first()
                    .and_then(|der| CertificateDetails::from_der(der).ok())
            })
            .and_then(|details| details.subject_common_name);
        info!("MOTD requested by {}", peer.as_deref().unwrap_or("<unknown>"));

        Ok(Response::new(Bulletin {
            bulletin: MOTD_BULLETIN.to_string(),
        }))
    }
}

/// 创建 Auth gRPC 服务器
pub fn create_auth_service(authenticator: LoginAuthenticator) -> AuthServer<AuthGrpcService> {
    AuthServer::new(AuthGrpcService::new(authenticator))
}

/// 创建 Protected gRPC 服务器
pub fn create_protected_service() -> ProtectedServer<ProtectedGrpcService> {
    ProtectedServer::new(ProtectedGrpcService)
}
