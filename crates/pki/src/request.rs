//! 证书签名请求 (CSR)

use crate::authority::distinguished_name;
use crate::codec::{self, PemKind};
use crate::error::{PkiError, PkiResult};
use crate::keys::PrivateKey;
use rcgen::string::{BmpString, Ia5String, PrintableString, TeletexString, UniversalString};
use rcgen::{CertificateParams, DistinguishedName, DnType, DnValue};
use tracing::warn;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::der_parser::asn1_rs::Tag;
use x509_parser::prelude::FromDer;
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

/// 以 `key` 的公钥生成 CSR，主题 CN 为 `common_name`，返回 PEM 文本
pub fn new_csr(key: &PrivateKey, common_name: &str) -> PkiResult<String> {
    let key_pair = key.signing_key_pair()?;

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);

    let csr = params
        .serialize_request(&key_pair)
        .map_err(|e| PkiError::Signing(format!("failed to build CSR: {e}")))?;

    Ok(codec::encode(csr.der(), PemKind::CertificateRequest))
}

/// 已通过自签名校验的 CSR
///
/// 只能经由 [`CertificateRequest::from_pem`] 构造，因此持有该值即意味着
/// 请求方确实掌握与内嵌公钥对应的私钥。签发时只使用主题与公钥，
/// CSR 中请求的扩展一律忽略。
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    common_name: Option<String>,
    subject: DistinguishedName,
    subject_der: Vec<u8>,
    public_key: Vec<u8>,
    spki_der: Vec<u8>,
}

impl CertificateRequest {
    /// 解码、解析并验证 CSR
    ///
    /// 依次失败为：标签/PEM 错误 [`PkiError::Format`]，DER 结构错误
    /// [`PkiError::Parse`]，自签名不成立 [`PkiError::SignatureInvalid`]。
    pub fn from_pem(csr_pem: &str) -> PkiResult<Self> {
        let der = codec::decode(csr_pem, PemKind::CertificateRequest)?;

        let (rest, csr) = X509CertificationRequest::from_der(&der)
            .map_err(|e| PkiError::Parse(format!("malformed certificate request: {e}")))?;
        if !rest.is_empty() {
            return Err(PkiError::Parse(format!(
                "{} trailing bytes after certificate request",
                rest.len()
            )));
        }

        csr.verify_signature()
            .map_err(|e| PkiError::SignatureInvalid(e.to_string()))?;

        let info = &csr.certification_request_info;
        let common_name = info
            .subject
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_owned);

        Ok(Self {
            common_name,
            subject: subject_name(&info.subject),
            subject_der: info.subject.as_raw().to_vec(),
            public_key: info.subject_pki.subject_public_key.data.to_vec(),
            spki_der: info.subject_pki.raw.to_vec(),
        })
    }

    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// 主题的原始 DER 编码
    pub fn subject_der(&self) -> &[u8] {
        &self.subject_der
    }

    pub(crate) fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    /// 完整的 SubjectPublicKeyInfo DER
    pub(crate) fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// 请求方公钥（SEC1 编码点）
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// 将 CSR 主题转换为签发用的名称，保留属性顺序与字符串类型
///
/// 多值 RDN 被展开为连续的单值 RDN；同一属性类型重复出现时只保留第一个。
fn subject_name(name: &X509Name<'_>) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    for rdn in name.iter() {
        if rdn.iter().nth(1).is_some() {
            warn!("Flattening multi-valued RDN in CSR subject");
        }
        for attr in rdn.iter() {
            push_attribute(&mut dn, attr);
        }
    }
    dn
}

fn push_attribute(dn: &mut DistinguishedName, attr: &AttributeTypeAndValue<'_>) {
    let Some(oid) = attr.attr_type().iter() else {
        warn!("Skipping subject attribute with an unencodable OID");
        return;
    };
    let dn_type = DnType::from_oid(&oid.collect::<Vec<_>>());
    if dn.get(&dn_type).is_some() {
        warn!("Dropping repeated subject attribute {}", attr.attr_type());
        return;
    }
    match attribute_value(attr) {
        Some(value) => dn.push(dn_type, value),
        None => warn!("Dropping non-string subject attribute {}", attr.attr_type()),
    }
}

fn attribute_value(attr: &AttributeTypeAndValue<'_>) -> Option<DnValue> {
    let value = attr.attr_value();
    let data = value.data;
    let text = std::str::from_utf8(data).ok();

    let exact = match value.header.tag() {
        Tag::PrintableString => text
            .and_then(|t| PrintableString::try_from(t).ok())
            .map(DnValue::PrintableString),
        Tag::Ia5String => text
            .and_then(|t| Ia5String::try_from(t).ok())
            .map(DnValue::Ia5String),
        Tag::T61String => text
            .and_then(|t| TeletexString::try_from(t).ok())
            .map(DnValue::TeletexString),
        Tag::BmpString => BmpString::from_utf16be(data.to_vec())
            .ok()
            .map(DnValue::BmpString),
        Tag::UniversalString => UniversalString::from_utf32be(data.to_vec())
            .ok()
            .map(DnValue::UniversalString),
        Tag::Utf8String => text.map(|t| DnValue::Utf8String(t.to_owned())),
        _ => None,
    };

    // 字符集不合规或其他字符串类型，退化为 UTF8String
    exact.or_else(|| match value.header.tag() {
        Tag::PrintableString
        | Tag::Ia5String
        | Tag::T61String
        | Tag::NumericString
        | Tag::VisibleString => text.map(|t| DnValue::Utf8String(t.to_owned())),
        _ => None,
    })
}
