//! 证书与 CA 材料的本地持久化

use crate::authority::{CertificateAuthority, self_sign};
use crate::certificate::CertificateDetails;
use crate::error::{PkiError, PkiResult};
use crate::keys::PrivateKey;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// 保存证书 PEM
pub fn save_cert(cert_pem: &str, path: impl AsRef<Path>) -> PkiResult<()> {
    let path = path.as_ref();
    fs::write(path, cert_pem).map_err(|e| PkiError::io(path, e))
}

/// 加载证书 PEM，校验标签并解析 DER 后原样返回
pub fn load_cert(path: impl AsRef<Path>) -> PkiResult<String> {
    let path = path.as_ref();
    let cert_pem = fs::read_to_string(path).map_err(|e| PkiError::io(path, e))?;
    CertificateDetails::from_pem(&cert_pem)?;
    Ok(cert_pem)
}

/// CA 私钥与根证书的存放位置
#[derive(Debug, Clone)]
pub struct CaStore {
    key_path: PathBuf,
    cert_path: PathBuf,
}

impl CaStore {
    pub fn new(key_path: impl Into<PathBuf>, cert_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            cert_path: cert_path.into(),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// 加载 CA；私钥或根证书缺失时生成并写回
    ///
    /// 私钥缺失时根证书必然随之重签，旧证书不再与新私钥匹配。
    pub fn load_or_generate(
        &self,
        common_name: &str,
        user_cert_ttl: Duration,
    ) -> PkiResult<CertificateAuthority> {
        let key_exists = self.key_path.exists();
        let key = if key_exists {
            info!("Loading CA private key from {:?}", self.key_path);
            PrivateKey::load(&self.key_path)?
        } else {
            info!("CA private key not found, generating new key at {:?}", self.key_path);
            let key = PrivateKey::generate()?;
            ensure_parent(&self.key_path)?;
            key.save(&self.key_path)?;
            key
        };

        let anchor_pem = if key_exists && self.cert_path.exists() {
            info!("Loading CA certificate from {:?}", self.cert_path);
            load_cert(&self.cert_path)?
        } else {
            if self.cert_path.exists() {
                warn!(
                    "Replacing CA certificate {:?} because the private key was regenerated",
                    self.cert_path
                );
            }
            let anchor_pem = self_sign(&key, common_name)?;
            ensure_parent(&self.cert_path)?;
            save_cert(&anchor_pem, &self.cert_path)?;
            info!("✅ CA certificate written to {:?}", self.cert_path);
            anchor_pem
        };

        CertificateAuthority::new(key, anchor_pem, user_cert_ttl)
    }
}

fn ensure_parent(path: &Path) -> PkiResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| PkiError::io(parent, e))
        }
        _ => Ok(()),
    }
}
