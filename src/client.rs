//! login / motd 子命令
//!
//! 客户端私钥只在本地生成和保存，服务端只会看到 CSR。

use crate::cli::{CredentialPaths, LoginArgs, MotdArgs};
use crate::error::Result;
use auth::{ClientTls, SessionClient, SessionClientConfig};
use dialoguer::{Input, Password, theme::ColorfulTheme};
use pki::{PrivateKey, load_cert, new_csr, save_cert};
use std::path::Path;
use tracing::{debug, info};

/// 登录与 MOTD 请求的截止时间
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 非交互环境下读取口令的环境变量
const PASSWORD_ENV: &str = "TLS_SESS_PASSWORD";

pub(crate) async fn login(args: &LoginArgs) -> Result<()> {
    let key = load_or_generate_key(&args.paths.key)?;

    let theme = ColorfulTheme::default();
    let username = match &args.username {
        Some(username) => username.clone(),
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()?,
    };

    let common_name = args.common_name.as_deref().unwrap_or(&username);
    let csr = new_csr(&key, common_name)?;
    debug!("CSR created for {}", common_name);

    let client = SessionClient::connect(&SessionClientConfig {
        endpoint: args.connect.clone(),
        timeout_seconds: REQUEST_TIMEOUT_SECS,
        tls: None,
    })
    .await?;
    let issued = client.login(&username, &password, &csr).await?;

    ensure_parent(&args.paths.cert)?;
    save_cert(&issued.cert_pem, &args.paths.cert)?;
    ensure_parent(&args.paths.root)?;
    save_cert(&issued.anchor_pem, &args.paths.root)?;

    info!("Client certificate saved to {:?}", args.paths.cert);
    println!("✅ Logged in as {username}");
    println!("  - certificate: {}", args.paths.cert.display());
    println!("  - trust anchor: {}", args.paths.root.display());
    Ok(())
}

pub(crate) async fn motd(args: &MotdArgs) -> Result<()> {
    let tls = load_client_tls(&args.paths, &args.server_name)?;

    let client = SessionClient::connect(&SessionClientConfig {
        endpoint: args.connect.clone(),
        timeout_seconds: REQUEST_TIMEOUT_SECS,
        tls: Some(tls),
    })
    .await?;
    let bulletin = client.motd().await?;

    println!("{bulletin}");
    Ok(())
}

fn load_or_generate_key(path: &Path) -> Result<PrivateKey> {
    if path.exists() {
        debug!("Loading client key from {:?}", path);
        return Ok(PrivateKey::load(path)?);
    }

    info!("Generating client key at {:?}", path);
    let key = PrivateKey::generate()?;
    ensure_parent(path)?;
    key.save(path)?;
    Ok(key)
}

fn load_client_tls(paths: &CredentialPaths, server_name: &str) -> Result<ClientTls> {
    let key = PrivateKey::load(&paths.key)?;
    Ok(ClientTls {
        server_name: server_name.to_string(),
        anchor_pem: load_cert(&paths.root)?,
        cert_pem: load_cert(&paths.cert)?,
        key_pem: key.to_pem()?.to_string(),
    })
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
