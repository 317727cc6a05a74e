//! Session Protocol Buffer Definitions
//!
//! # Modules
//!
//! - [`tlsess::v1`]: `Auth` (password login, certificate issuance) and
//!   `Protected` (mTLS-only bulletin) service definitions
//!
//! # Usage
//!
//! ```ignore
//! use sess_proto::{AuthClient, LoginRequest};
//! use sess_proto::tlsess::v1::protected_server::ProtectedServer;
//! ```

/// Login and protected service protocol definitions.
pub mod tlsess {
    pub mod v1 {
        tonic::include_proto!("tlsess.v1");
    }
}

// ============================================================================
// Re-exports: messages
// ============================================================================

pub use tlsess::v1::{Bulletin, LoginRequest, LoginResponse, MotdRequest};

// ============================================================================
// Re-exports: clients and servers
// ============================================================================

pub use tlsess::v1::{
    auth_client::AuthClient,
    auth_server::{Auth, AuthServer},
    protected_client::ProtectedClient,
    protected_server::{Protected, ProtectedServer},
};
