//! 服务管理模块

pub mod grpc;
pub mod supervisor;

pub use grpc::{AuthGrpcServer, ProtectedGrpcServer};
pub use supervisor::ServiceSupervisor;
