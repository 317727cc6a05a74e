//! 椭圆曲线 (P-256) 密钥材料
//!
//! 私钥以 SEC1 DER 编码后包装为 `EC PRIVATE KEY` PEM 块持久化到本地，
//! 永远不会通过网络传输。

use crate::codec::{self, PemKind};
use crate::error::{PkiError, PkiResult};
use p256::SecretKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::elliptic_curve::zeroize::Zeroizing;
use p256::pkcs8::{EncodePrivateKey, LineEnding};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// P-256 私钥
#[derive(Clone)]
pub struct PrivateKey {
    inner: SecretKey,
}

impl PrivateKey {
    /// 使用操作系统 CSPRNG 生成新的密钥对
    pub fn generate() -> PkiResult<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng
            .try_fill_bytes(seed.as_mut_slice())
            .map_err(|e| PkiError::Crypto(format!("random source failure: {e}")))?;

        // 标量为零或不小于曲线阶时拒绝，概率可忽略
        let inner = SecretKey::from_slice(seed.as_slice())
            .map_err(|e| PkiError::Crypto(format!("invalid P-256 scalar: {e}")))?;

        Ok(Self { inner })
    }

    /// 未压缩 SEC1 公钥点 (0x04 || X || Y)
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.inner
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// 编码为 `EC PRIVATE KEY` PEM 文本
    pub fn to_pem(&self) -> PkiResult<Zeroizing<String>> {
        let der = self
            .inner
            .to_sec1_der()
            .map_err(|e| PkiError::Crypto(format!("failed to encode private key: {e}")))?;
        Ok(Zeroizing::new(codec::encode(&der, PemKind::PrivateKey)))
    }

    /// 从 `EC PRIVATE KEY` PEM 文本解码
    pub fn from_pem(pem_text: &str) -> PkiResult<Self> {
        let der = Zeroizing::new(codec::decode(pem_text, PemKind::PrivateKey)?);
        let inner = SecretKey::from_sec1_der(&der)
            .map_err(|e| PkiError::Parse(format!("malformed EC private key: {e}")))?;
        Ok(Self { inner })
    }

    /// 保存到文件（Unix 下权限 0600）
    pub fn save(&self, path: impl AsRef<Path>) -> PkiResult<()> {
        let path = path.as_ref();
        let pem_text = self.to_pem()?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|e| PkiError::io(path, e))?;
        file.write_all(pem_text.as_bytes())
            .map_err(|e| PkiError::io(path, e))?;

        debug!("Private key saved to {:?}", path);
        Ok(())
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> PkiResult<Self> {
        let path = path.as_ref();
        let pem_text = Zeroizing::new(fs::read_to_string(path).map_err(|e| PkiError::io(path, e))?);
        Self::from_pem(&pem_text)
    }

    /// PKCS#8 形式交给 rcgen 作为签名密钥
    pub(crate) fn signing_key_pair(&self) -> PkiResult<rcgen::KeyPair> {
        let pkcs8 = self
            .inner
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| PkiError::Crypto(format!("failed to export PKCS#8 key: {e}")))?;
        rcgen::KeyPair::from_pem(&pkcs8)
            .map_err(|e| PkiError::Crypto(format!("failed to load signing key: {e}")))
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner.to_bytes() == other.inner.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}
