//! 命令行界面定义
//!
//! 定义了主程序的命令行参数和子命令
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tls-sess")]
#[command(version)]
#[command(about = "Password login that issues short-lived client certificates, plus an mTLS-protected service")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Configuration file path (defaults to searching standard locations)
    #[arg(short, long, default_value = "config.toml")]
    pub(crate) config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the Auth and Protected servers (default when no subcommand is given)
    Serve,

    /// Log in with username/password and obtain a client certificate
    Login(LoginArgs),

    /// Fetch the bulletin from the Protected service over mTLS
    Motd(MotdArgs),

    /// Test configuration file
    Test {
        /// Configuration file path (optional, defaults to config.toml)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },
}

/// 客户端证书材料的存放位置
#[derive(Args, Debug, Clone)]
pub(crate) struct CredentialPaths {
    /// Client private key (generated on first login)
    #[arg(long, default_value = "certs/client_key.pem")]
    pub(crate) key: PathBuf,

    /// Client certificate issued by the Auth service
    #[arg(long, default_value = "certs/client_cert.pem")]
    pub(crate) cert: PathBuf,

    /// Trust anchor (CA root certificate) returned at login
    #[arg(long, default_value = "certs/root_cert.pem")]
    pub(crate) root: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct LoginArgs {
    /// Auth service address
    #[arg(long, default_value = "127.0.0.1:4443")]
    pub(crate) connect: String,

    #[command(flatten)]
    pub(crate) paths: CredentialPaths,

    /// Username (prompted when omitted)
    #[arg(short, long)]
    pub(crate) username: Option<String>,

    /// Common name placed in the CSR (defaults to the username)
    #[arg(long)]
    pub(crate) common_name: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct MotdArgs {
    /// Protected service address
    #[arg(long, default_value = "127.0.0.1:4444")]
    pub(crate) connect: String,

    #[command(flatten)]
    pub(crate) paths: CredentialPaths,

    /// DNS name expected in the server certificate
    #[arg(long, default_value = "tls-sess-demo")]
    pub(crate) server_name: String,
}
