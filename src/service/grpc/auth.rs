//! Auth gRPC 服务（明文）
//!
//! 客户端此时尚未持有证书，因此该监听不启用 TLS。

use anyhow::Result;
use auth::{LoginAuthenticator, create_auth_service};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

/// Auth gRPC 服务
#[derive(Debug)]
pub struct AuthGrpcServer {
    authenticator: LoginAuthenticator,
}

impl AuthGrpcServer {
    pub fn new(authenticator: LoginAuthenticator) -> Self {
        Self { authenticator }
    }

    /// 在已绑定的监听上运行，直到收到关闭信号
    pub async fn start(
        self,
        listener: TcpListener,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<()> {
        let addr = listener.local_addr()?;
        let grpc_service = create_auth_service(self.authenticator);

        info!("✅ Auth gRPC service listening on {}", addr);

        let server = Server::builder()
            .add_service(grpc_service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = shutdown_rx.recv().await;
                info!("Auth gRPC service received shutdown signal");
            });

        if let Err(e) = server.await {
            error!("Auth gRPC server error: {}", e);
            return Err(anyhow::anyhow!("Auth gRPC server failed: {e}"));
        }

        info!("Auth gRPC service stopped");
        Ok(())
    }
}
