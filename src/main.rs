//! tls-sess 主程序
//!
//! 服务端：启动 CA、明文 Auth 服务与 mTLS Protected 服务。
//! 客户端：login 换取证书，motd 凭证书访问受保护服务。

mod cli;
mod client;
mod error;
mod observability;
mod service;

use auth::{LoginAuthenticator, SessionGateway, StaticIdentityVerifier};
use clap::Parser;
use observability::{init_client_logging, init_observability};
use pki::CaStore;
use service::{AuthGrpcServer, ProtectedGrpcServer, ServiceSupervisor};
use sess_common::config::SessConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use tracing::{error, info};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?
                    .ok_or_else(ApplicationLauncher::no_config_error)?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        Some(Commands::Login(args)) => {
            init_client_logging();
            ApplicationLauncher::runtime()?.block_on(client::login(args))
        }
        Some(Commands::Motd(args)) => {
            init_client_logging();
            ApplicationLauncher::runtime()?.block_on(client::motd(args))
        }
        Some(Commands::Serve) | None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;
            let config = ApplicationLauncher::load_config(config_path.as_deref())?;

            // Run the asynchronous application
            ApplicationLauncher::runtime()?.block_on(ApplicationLauncher::run_application(config))
        }
    }
}

impl ApplicationLauncher {
    fn runtime() -> Result<tokio::runtime::Runtime> {
        Ok(tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?)
    }

    /// Find config file with fallback locations
    ///
    /// An explicit path must exist. When none of the default locations has a
    /// file, `Ok(None)` is returned and the caller decides what to do.
    fn find_config_file(provided_path: &PathBuf) -> Result<Option<PathBuf>> {
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(Some(provided_path.clone()));
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = Self::fallback_paths();

        bootstrap_info!("Searching for config file in default locations...");

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(Some(path.clone()));
            } else {
                bootstrap_info!("Config not found at: {:?}", path);
            }
        }

        Ok(None)
    }

    fn fallback_paths() -> Vec<PathBuf> {
        vec![
            // 1. Current working directory
            PathBuf::from("config.toml"),
            // 2. System config directory
            PathBuf::from("/etc/tls-sess/config.toml"),
        ]
    }

    fn no_config_error() -> Error {
        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in Self::fallback_paths().iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: tls-sess test <path>");

        Error::custom("No configuration file found. Please create one or pass its path")
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        // Initialize basic logging for test command
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();

        match SessConfig::from_file(config_path) {
            Ok(config) => {
                info!("✅ 配置文件解析成功: {:?}", config_path);

                if let Err(errors) = config.validate() {
                    let has_errors = errors.iter().any(|e| !e.starts_with("Warning:"));
                    if has_errors {
                        error!("❌ 配置验证发现问题:");
                    } else {
                        info!("⚠️  配置验证发现警告:");
                    }
                    for (i, err) in errors.iter().enumerate() {
                        if err.starts_with("Warning:") {
                            info!("  {}. ⚠️  {}", i + 1, err);
                        } else {
                            error!("  {}. ❌ {}", i + 1, err);
                        }
                    }
                    if has_errors {
                        return Err(Error::service_validation("配置验证失败".to_string()));
                    }
                }

                info!("✅ 配置验证通过");
                Ok(())
            }
            Err(e) => {
                error!("❌ 配置文件解析失败: {}", e);
                Err(Error::service_validation(format!("配置解析失败: {e}")))
            }
        }
    }

    /// 加载并验证配置；默认位置都没有配置文件时使用内置默认值
    fn load_config(config_path: Option<&Path>) -> Result<SessConfig> {
        let config = match config_path {
            Some(path) => {
                bootstrap_info!("📄 加载配置文件: {:?}", path);
                match SessConfig::from_file(path) {
                    Ok(config) => {
                        bootstrap_info!("✅ 配置加载成功");
                        config
                    }
                    Err(e) => {
                        bootstrap_error!("❌ 配置加载失败: {}", e);
                        return Err(Error::custom(format!("配置加载失败: {e}")));
                    }
                }
            }
            None => {
                bootstrap_info!("No configuration file found, using built-in defaults");
                SessConfig::default()
            }
        };

        if let Err(errors) = config.validate() {
            let mut has_critical_errors = false;
            for (i, err) in errors.iter().enumerate() {
                if err.starts_with("Warning:") {
                    bootstrap_info!("  {}. ⚠️  {}", i + 1, err);
                } else {
                    bootstrap_error!("  {}. ❌ {}", i + 1, err);
                    has_critical_errors = true;
                }
            }
            if has_critical_errors {
                bootstrap_error!("❌ 配置验证失败");
                return Err(Error::service_validation(
                    "配置验证失败，请修复上述错误".to_string(),
                ));
            }
        }

        Ok(config)
    }

    /// 运行服务端的主入口
    async fn run_application(config: SessConfig) -> Result<()> {
        // 初始化可观测性系统（日志）
        let _observability_guard = init_observability(&config)?;

        info!("🚀 启动会话服务: {} ({})", config.name, config.env);

        // CA 材料：缺失时生成并写回
        let store = CaStore::new(&config.ca.key_path, &config.ca.cert_path);
        let authority = Arc::new(store.load_or_generate(&config.name, config.ca.user_cert_ttl())?);
        info!("✅ CA 就绪: {}", authority.subject());

        let verifier = StaticIdentityVerifier::from(&config.auth);
        let authenticator = LoginAuthenticator::new(authority.clone(), Arc::new(verifier));
        let gateway = SessionGateway::new(&authority, &config.name, config.ca.server_cert_ttl())?;

        // 在启动任何任务前完成端口绑定，绑定失败直接返回
        let auth_listener = Self::bind("Auth", config.bind.auth_addr()).await?;
        let protected_listener = Self::bind("Protected", config.bind.protected_addr()).await?;

        // 初始化全局关闭通道（供所有服务共享）
        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(10);

        // 安装 Ctrl-C 处理器，确保任何阶段都能广播关闭
        setup_ctrl_c_handler(shutdown_tx.clone()).await;

        let mut supervisor = ServiceSupervisor::new(shutdown_tx.clone());
        supervisor.spawn(
            "Auth",
            AuthGrpcServer::new(authenticator).start(auth_listener, shutdown_tx.subscribe()),
        );
        supervisor.spawn(
            "Protected",
            ProtectedGrpcServer::new(gateway).start(protected_listener, shutdown_tx.subscribe()),
        );

        Self::display_service_info(&config);

        // 任一服务失败都会广播关闭，不论它排在第几个
        supervisor.wait().await?;

        info!("🛑 所有服务已安全关闭");
        Ok(())
    }

    async fn bind(
        name: &str,
        addr: std::result::Result<SocketAddr, std::net::AddrParseError>,
    ) -> Result<TcpListener> {
        let addr =
            addr.map_err(|e| Error::service_startup(format!("{name} address is invalid: {e}")))?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| Error::service_startup(format!("Failed to bind {name} on {addr}: {e}")))
    }

    /// 显示服务信息
    fn display_service_info(config: &SessConfig) {
        info!("✅ 所有服务已启动");
        info!("🔌 gRPC 服务:");
        info!("  - Auth (plaintext):  {}", config.bind.auth);
        info!("  - Protected (mTLS):  {} (server name: {})", config.bind.protected, config.name);
        info!("📜 CA 根证书: {:?}", config.ca.cert_path);
    }
}

/// 设置Ctrl-C信号处理程序
async fn setup_ctrl_c_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听Ctrl-C信号: {}", e);
            return;
        }
        info!("收到Ctrl-C信号，开始优雅关闭...");
        let _ = shutdown_tx.send(());
    });
}
