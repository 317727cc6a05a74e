//! 证书颁发机构
//!
//! 根证书自签、CSR 签发客户端证书，以及为受保护网关签发服务端证书。
//! CA 从不生成或接触客户端私钥，只使用 CSR 中携带的公钥。

use crate::certificate::CertificateDetails;
use crate::codec::{self, PemKind};
use crate::error::{PkiError, PkiResult};
use crate::keys::PrivateKey;
use crate::request::CertificateRequest;
use p256::elliptic_curve::zeroize::Zeroizing;
use rand::RngCore;
use rand::rngs::OsRng;
use rcgen::string::Ia5String;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyUsagePurpose, SanType, SerialNumber,
    SubjectPublicKeyInfo,
};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info};

/// 根证书有效期（年）
pub const ROOT_VALIDITY_YEARS: i32 = 5;

/// 会话客户端证书默认有效期：7 天
pub const DEFAULT_USER_CERT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// 序列号字节数 (128 bit)
const SERIAL_LEN: usize = 16;

const OID_BASIC_CONSTRAINTS: &[u64] = &[2, 5, 29, 19];

/// BasicConstraints ::= SEQUENCE { pathLenConstraint INTEGER 0 }，cA 取默认 FALSE
const END_ENTITY_BASIC_CONSTRAINTS: [u8; 5] = [0x30, 0x03, 0x02, 0x01, 0x00];

/// 自签根证书
///
/// CA=true，pathLen=0，有效期 [now, now + 5 年)，KeyUsage
/// {digitalSignature, keyEncipherment, keyCertSign}，EKU {clientAuth, serverAuth}。
pub fn self_sign(key: &PrivateKey, common_name: &str) -> PkiResult<String> {
    let serial = random_serial()?;
    let not_before = OffsetDateTime::now_utc();
    let not_after = add_years(not_before, ROOT_VALIDITY_YEARS)?;

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);
    params.serial_number = Some(serial);
    params.not_before = not_before;
    params.not_after = not_after;
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyCertSign,
    ];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ClientAuth,
        ExtendedKeyUsagePurpose::ServerAuth,
    ];

    let key_pair = key.signing_key_pair()?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| PkiError::Signing(format!("failed to self-sign root certificate: {e}")))?;

    info!("Self-signed root certificate issued for CN={}", common_name);
    Ok(codec::encode(cert.der(), PemKind::Certificate))
}

/// 使用 CA 私钥签发 CSR
///
/// 先校验 CSR（标签、结构、自签名），再生成随机序列号并构造客户端证书：
/// 主题取自 CSR，颁发者为根证书主题，有效期 [now, now + ttl)，CA=false，
/// pathLen=0，KeyUsage {digitalSignature, keyEncipherment}，EKU {clientAuth}。
pub fn sign_csr(
    key: &PrivateKey,
    root_pem: &str,
    csr_pem: &str,
    ttl: Duration,
) -> PkiResult<String> {
    let request = CertificateRequest::from_pem(csr_pem)?;
    let serial = random_serial()?;
    let (not_before, not_after) = validity_window(ttl)?;

    // 只取 CSR 的主题与公钥，其余字段全部由 CA 决定，请求的扩展不予理会
    let mut params = CertificateParams::default();
    params.distinguished_name = request.subject().clone();
    params.serial_number = Some(serial);
    params.not_before = not_before;
    params.not_after = not_after;
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    params.custom_extensions = vec![end_entity_basic_constraints()];

    let subject_key = SubjectPublicKeyInfo::from_der(request.spki_der())
        .map_err(|e| PkiError::Parse(format!("unsupported CSR public key: {e}")))?;

    check_root_label(root_pem)?;
    let ca_key = key.signing_key_pair()?;
    let issuer = Issuer::from_ca_cert_pem(root_pem, &ca_key)
        .map_err(|e| PkiError::Parse(format!("failed to read root certificate: {e}")))?;
    let cert = params
        .signed_by(&subject_key, &issuer)
        .map_err(|e| PkiError::Signing(format!("failed to sign certificate: {e}")))?;

    debug!(
        common_name = request.common_name().unwrap_or_default(),
        ttl_secs = ttl.as_secs(),
        "Client certificate issued"
    );
    Ok(codec::encode(cert.der(), PemKind::Certificate))
}

/// 网关服务端身份：证书与对应私钥（仅驻留内存）
pub struct ServerIdentity {
    pub cert_pem: String,
    pub key_pem: Zeroizing<String>,
}

impl std::fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("cert_pem", &self.cert_pem)
            .finish_non_exhaustive()
    }
}

/// 持有签名私钥与根证书的 CA 实例
///
/// 构造一次后只读，可通过 `Arc` 在并发请求间共享。
pub struct CertificateAuthority {
    key: PrivateKey,
    anchor_pem: String,
    subject: String,
    user_cert_ttl: Duration,
}

impl CertificateAuthority {
    /// 由已有的私钥与根证书构造
    ///
    /// 根证书必须是 CA 证书，且其公钥必须属于 `key`。
    pub fn new(key: PrivateKey, anchor_pem: String, user_cert_ttl: Duration) -> PkiResult<Self> {
        let details = CertificateDetails::from_pem(&anchor_pem)?;

        if !details.is_ca {
            return Err(PkiError::Parse(
                "anchor certificate is not a CA certificate".to_string(),
            ));
        }
        if details.public_key != key.public_key_bytes() {
            return Err(PkiError::KeyMismatch);
        }

        Ok(Self {
            key,
            subject: details.subject_common_name.unwrap_or_default(),
            anchor_pem,
            user_cert_ttl,
        })
    }

    /// 生成全新的 CA（私钥与自签根证书）
    pub fn generate(common_name: &str, user_cert_ttl: Duration) -> PkiResult<Self> {
        let key = PrivateKey::generate()?;
        let anchor_pem = self_sign(&key, common_name)?;
        Self::new(key, anchor_pem, user_cert_ttl)
    }

    /// 以配置的 TTL 签发客户端证书
    pub fn sign(&self, csr_pem: &str) -> PkiResult<String> {
        sign_csr(&self.key, &self.anchor_pem, csr_pem, self.user_cert_ttl)
    }

    /// 以指定 TTL 签发客户端证书
    pub fn sign_with_ttl(&self, csr_pem: &str, ttl: Duration) -> PkiResult<String> {
        sign_csr(&self.key, &self.anchor_pem, csr_pem, ttl)
    }

    /// 为网关签发服务端证书
    ///
    /// 新生成一把 P-256 私钥；SAN 包含 `server_name` 与 `localhost`，
    /// EKU 仅 serverAuth。
    pub fn issue_server_identity(
        &self,
        server_name: &str,
        ttl: Duration,
    ) -> PkiResult<ServerIdentity> {
        let server_key = PrivateKey::generate()?;
        let (not_before, not_after) = validity_window(ttl)?;

        let mut names = vec![server_name.to_string()];
        if server_name != "localhost" {
            names.push("localhost".to_string());
        }

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(server_name);
        params.serial_number = Some(random_serial()?);
        params.not_before = not_before;
        params.not_after = not_after;
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        params.subject_alt_names = names
            .into_iter()
            .map(|name| {
                Ia5String::try_from(name.clone())
                    .map(SanType::DnsName)
                    .map_err(|e| PkiError::Signing(format!("invalid DNS name '{name}': {e}")))
            })
            .collect::<PkiResult<Vec<_>>>()?;

        let subject_key = server_key.signing_key_pair()?;
        let ca_key = self.key.signing_key_pair()?;
        let issuer = Issuer::from_ca_cert_pem(&self.anchor_pem, &ca_key)
            .map_err(|e| PkiError::Parse(format!("failed to read root certificate: {e}")))?;
        let cert = params
            .signed_by(&subject_key, &issuer)
            .map_err(|e| PkiError::Signing(format!("failed to sign server certificate: {e}")))?;

        info!("Server certificate issued for {}", server_name);
        Ok(ServerIdentity {
            cert_pem: codec::encode(cert.der(), PemKind::Certificate),
            key_pem: server_key.to_pem()?,
        })
    }

    /// 根证书 PEM（信任锚）
    pub fn anchor_pem(&self) -> &str {
        &self.anchor_pem
    }

    /// 根证书主题 CN
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn user_cert_ttl(&self) -> Duration {
        self.user_cert_ttl
    }
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("subject", &self.subject)
            .field("user_cert_ttl", &self.user_cert_ttl)
            .finish_non_exhaustive()
    }
}

pub(crate) fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn
}

/// rcgen 不区分 PEM 标签，交给它之前先按标签校验
fn check_root_label(root_pem: &str) -> PkiResult<()> {
    codec::decode(root_pem, PemKind::Certificate).map(|_| ())
}

fn end_entity_basic_constraints() -> CustomExtension {
    let mut ext =
        CustomExtension::from_oid_content(OID_BASIC_CONSTRAINTS, END_ENTITY_BASIC_CONSTRAINTS.to_vec());
    ext.set_criticality(true);
    ext
}

fn random_serial() -> PkiResult<SerialNumber> {
    random_serial_bytes().map(|bytes| SerialNumber::from_slice(&bytes))
}

fn random_serial_bytes() -> PkiResult<[u8; SERIAL_LEN]> {
    let mut bytes = [0u8; SERIAL_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| PkiError::Crypto(format!("failed to generate serial number: {e}")))?;
    Ok(bytes)
}

fn validity_window(ttl: Duration) -> PkiResult<(OffsetDateTime, OffsetDateTime)> {
    let ttl = time::Duration::try_from(ttl)
        .map_err(|e| PkiError::Signing(format!("invalid certificate lifetime: {e}")))?;
    let not_before = OffsetDateTime::now_utc();
    let not_after = not_before
        .checked_add(ttl)
        .ok_or_else(|| PkiError::Signing("certificate lifetime overflows".to_string()))?;
    Ok((not_before, not_after))
}

/// 按日历年偏移；2 月 29 日落到非闰年时顺延至 3 月 1 日
fn add_years(at: OffsetDateTime, years: i32) -> PkiResult<OffsetDateTime> {
    let year = at.year() + years;
    at.replace_year(year)
        .or_else(|_| {
            at.replace_day(28)
                .and_then(|d| d.replace_year(year))
                .map(|d| d + time::Duration::days(1))
        })
        .map_err(|e| PkiError::Signing(format!("invalid root validity: {e}")))
}
