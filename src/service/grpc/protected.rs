//! Protected gRPC 服务（mTLS）
//!
//! 客户端证书链在握手阶段由 TLS 层校验，未通过的连接到不了 MOTD 处理函数。

use anyhow::{Context, Result};
use auth::{SessionGateway, create_protected_service};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

/// Protected gRPC 服务
#[derive(Debug)]
pub struct ProtectedGrpcServer {
    gateway: SessionGateway,
}

impl ProtectedGrpcServer {
    pub fn new(gateway: SessionGateway) -> Self {
        Self { gateway }
    }

    /// 在已绑定的监听上运行，直到收到关闭信号
    pub async fn start(
        self,
        listener: TcpListener,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<()> {
        let addr = listener.local_addr()?;

        let server = Server::builder()
            .tls_config(self.gateway.tls_config())
            .context("Invalid gateway TLS configuration")?
            .add_service(create_protected_service())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = shutdown_rx.recv().await;
                info!("Protected gRPC service received shutdown signal");
            });

        info!("✅ Protected gRPC service (mTLS) listening on {}", addr);

        if let Err(e) = server.await {
            error!("Protected gRPC server error: {}", e);
            return Err(anyhow::anyhow!("Protected gRPC server failed: {e}"));
        }

        info!("Protected gRPC service stopped");
        Ok(())
    }
}
