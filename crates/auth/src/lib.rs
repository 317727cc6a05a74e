//! 登录签发与受保护会话
//!
//! - [`LoginAuthenticator`]: 校验口令与 CSR，调用 CA 签发客户端证书
//! - [`IdentityVerifier`]: 可替换的身份校验能力
//! - [`AuthGrpcService`] / [`ProtectedGrpcService`]: gRPC 处理器
//! - [`SessionGateway`]: 受保护服务的 mTLS 配置
//! - [`SessionClient`]: 登录与 MOTD 客户端

pub mod error;
pub mod gateway;
pub mod grpc_client;
pub mod grpc_handlers;
pub mod login;
pub mod verifier;

pub use error::{ClientError, ClientResult, LoginError};
pub use gateway::{SessionGateway, gateway_tls_config};
pub use grpc_client::{ClientTls, SessionClient, SessionClientConfig};
pub use grpc_handlers::{
    AuthGrpcService, MOTD_BULLETIN, ProtectedGrpcService, create_auth_service,
    create_protected_service,
};
pub use login::{IssuedCredentials, LoginAttempt, LoginAuthenticator, LoginStage};
pub use verifier::{IdentityVerifier, StaticIdentityVerifier};
