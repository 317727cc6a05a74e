//! gRPC 服务模块
//!
//! Auth 与 Protected 两个监听各自独立运行，共享同一个关闭广播。

pub mod auth;
pub mod protected;

pub use self::auth::AuthGrpcServer;
pub use self::protected::ProtectedGrpcServer;
