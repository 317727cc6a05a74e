//! 证书解析与信任链校验

use crate::codec::{self, PemKind};
use crate::error::{PkiError, PkiResult};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

/// KeyUsage 位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyUsage {
    DigitalSignature,
    ContentCommitment,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    CertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

/// ExtendedKeyUsage 用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtendedKeyUsage {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    Other,
}

/// 证书中与会话签发相关的字段
#[derive(Debug, Clone)]
pub struct CertificateDetails {
    pub subject_common_name: Option<String>,
    pub issuer_common_name: Option<String>,
    /// 原始主题 DER，用于比较 issuer == subject
    pub subject_raw: Vec<u8>,
    pub issuer_raw: Vec<u8>,
    pub serial: Vec<u8>,
    pub not_before: i64,
    pub not_after: i64,
    /// BasicConstraints 扩展是否存在
    pub has_basic_constraints: bool,
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
    pub key_usage: Vec<KeyUsage>,
    pub extended_key_usage: Vec<ExtendedKeyUsage>,
    pub dns_names: Vec<String>,
    pub public_key: Vec<u8>,
}

impl CertificateDetails {
    /// 从 `CERTIFICATE` PEM 文本解析
    pub fn from_pem(cert_pem: &str) -> PkiResult<Self> {
        let der = codec::decode(cert_pem, PemKind::Certificate)?;
        Self::from_der(&der)
    }

    pub fn from_der(der: &[u8]) -> PkiResult<Self> {
        let cert = parse(der)?;

        let basic = cert
            .basic_constraints()
            .map_err(|e| PkiError::Parse(format!("basic constraints: {e}")))?;
        let key_usage = cert
            .key_usage()
            .map_err(|e| PkiError::Parse(format!("key usage: {e}")))?
            .map(|ext| key_usage_bits(ext.value))
            .unwrap_or_default();
        let extended_key_usage = cert
            .extended_key_usage()
            .map_err(|e| PkiError::Parse(format!("extended key usage: {e}")))?
            .map(|ext| extended_usages(ext.value))
            .unwrap_or_default();
        let dns_names = cert
            .subject_alternative_name()
            .map_err(|e| PkiError::Parse(format!("subject alternative name: {e}")))?
            .map(|ext| {
                ext.value
                    .general_names
                    .iter()
                    .filter_map(|name| match name {
                        x509_parser::extensions::GeneralName::DNSName(dns) => {
                            Some((*dns).to_string())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            subject_common_name: first_common_name(cert.subject()),
            issuer_common_name: first_common_name(cert.issuer()),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            serial: cert.raw_serial().to_vec(),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            has_basic_constraints: basic.is_some(),
            is_ca: basic.as_ref().is_some_and(|ext| ext.value.ca),
            path_len_constraint: basic.and_then(|ext| ext.value.path_len_constraint),
            key_usage,
            extended_key_usage,
            dns_names,
            public_key: cert.public_key().subject_public_key.data.to_vec(),
        })
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }
}

/// 验证 `cert_pem` 由 `anchor_pem` 的私钥签发
pub fn verify_issued_by(cert_pem: &str, anchor_pem: &str) -> PkiResult<()> {
    let cert_der = codec::decode(cert_pem, PemKind::Certificate)?;
    let anchor_der = codec::decode(anchor_pem, PemKind::Certificate)?;
    let cert = parse(&cert_der)?;
    let anchor = parse(&anchor_der)?;

    if cert.issuer().as_raw() != anchor.subject().as_raw() {
        return Err(PkiError::SignatureInvalid(
            "certificate issuer does not match the anchor subject".to_string(),
        ));
    }

    cert.verify_signature(Some(anchor.public_key()))
        .map_err(|e| PkiError::SignatureInvalid(e.to_string()))
}

fn parse(der: &[u8]) -> PkiResult<X509Certificate<'_>> {
    let (rest, cert) = X509Certificate::from_der(der)
        .map_err(|e| PkiError::Parse(format!("malformed certificate: {e}")))?;
    if !rest.is_empty() {
        return Err(PkiError::Parse(format!(
            "{} trailing bytes after certificate",
            rest.len()
        )));
    }
    Ok(cert)
}

fn first_common_name(name: &x509_parser::x509::X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned)
}

fn key_usage_bits(ku: &x509_parser::extensions::KeyUsage) -> Vec<KeyUsage> {
    [
        (ku.digital_signature(), KeyUsage::DigitalSignature),
        (ku.non_repudiation(), KeyUsage::ContentCommitment),
        (ku.key_encipherment(), KeyUsage::KeyEncipherment),
        (ku.data_encipherment(), KeyUsage::DataEncipherment),
        (ku.key_agreement(), KeyUsage::KeyAgreement),
        (ku.key_cert_sign(), KeyUsage::CertSign),
        (ku.crl_sign(), KeyUsage::CrlSign),
        (ku.encipher_only(), KeyUsage::EncipherOnly),
        (ku.decipher_only(), KeyUsage::DecipherOnly),
    ]
    .into_iter()
    .filter_map(|(set, usage)| set.then_some(usage))
    .collect()
}

fn extended_usages(eku: &x509_parser::extensions::ExtendedKeyUsage<'_>) -> Vec<ExtendedKeyUsage> {
    let mut usages: Vec<ExtendedKeyUsage> = [
        (eku.any, ExtendedKeyUsage::Any),
        (eku.server_auth, ExtendedKeyUsage::ServerAuth),
        (eku.client_auth, ExtendedKeyUsage::ClientAuth),
        (eku.code_signing, ExtendedKeyUsage::CodeSigning),
        (eku.email_protection, ExtendedKeyUsage::EmailProtection),
        (eku.time_stamping, ExtendedKeyUsage::TimeStamping),
        (eku.ocsp_signing, ExtendedKeyUsage::OcspSigning),
    ]
    .into_iter()
    .filter_map(|(set, usage)| set.then_some(usage))
    .collect();

    if !eku.other.is_empty() {
        usages.push(ExtendedKeyUsage::Other);
    }
    usages
}
