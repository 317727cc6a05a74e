use pki::{
    CertificateAuthority, CertificateDetails, CertificateRequest, DEFAULT_USER_CERT_TTL,
    ExtendedKeyUsage, KeyUsage, PemKind, PkiError, PrivateKey, codec, new_csr, self_sign,
    sign_csr, verify_issued_by,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const FIVE_YEARS_MIN_SECS: i64 = (5 * 365 + 1) * 24 * 60 * 60;
const FIVE_YEARS_MAX_SECS: i64 = (5 * 365 + 2) * 24 * 60 * 60;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as i64
}

fn root_with_key(common_name: &str) -> (PrivateKey, String) {
    let key = PrivateKey::generate().expect("generate CA key");
    let root = self_sign(&key, common_name).expect("self-sign root");
    (key, root)
}

#[test]
fn test_self_signed_root_fields() {
    let before = now_secs();
    let (key, root) = root_with_key("tls-sess-demo");
    let after = now_secs();

    let details = CertificateDetails::from_pem(&root).expect("parse root");

    assert_eq!(details.subject_common_name.as_deref(), Some("tls-sess-demo"));
    assert_eq!(details.issuer_common_name.as_deref(), Some("tls-sess-demo"));
    assert!(details.is_self_issued());

    assert!(details.is_ca);
    assert_eq!(details.path_len_constraint, Some(0));

    assert!(details.not_before >= before - 1 && details.not_before <= after + 1);
    let lifetime = details.not_after - details.not_before;
    assert!(
        (FIVE_YEARS_MIN_SECS..=FIVE_YEARS_MAX_SECS).contains(&lifetime),
        "root lifetime {lifetime}s is not five calendar years"
    );

    assert_eq!(
        details.key_usage,
        vec![
            KeyUsage::DigitalSignature,
            KeyUsage::KeyEncipherment,
            KeyUsage::CertSign
        ]
    );
    assert_eq!(
        details.extended_key_usage,
        vec![ExtendedKeyUsage::ServerAuth, ExtendedKeyUsage::ClientAuth]
    );
    assert_eq!(details.public_key, key.public_key_bytes());
    assert!(!details.serial.is_empty() && details.serial.len() <= 17);

    verify_issued_by(&root, &root).expect("root verifies against itself");
}

#[test]
fn test_signed_client_certificate_fields() {
    let (ca_key, root) = root_with_key("tls-sess-demo");
    let client_key = PrivateKey::generate().expect("generate client key");
    let csr = new_csr(&client_key, "alice").expect("build csr");
    let ttl = Duration::from_secs(3600);

    let cert = sign_csr(&ca_key, &root, &csr, ttl).expect("sign csr");
    let details = CertificateDetails::from_pem(&cert).expect("parse client cert");

    assert_eq!(details.subject_common_name.as_deref(), Some("alice"));
    assert_eq!(details.issuer_common_name.as_deref(), Some("tls-sess-demo"));
    assert!(!details.is_self_issued());

    assert!(details.has_basic_constraints);
    assert!(!details.is_ca);
    assert_eq!(details.path_len_constraint, Some(0));

    assert_eq!(details.not_after - details.not_before, 3600);
    assert!((details.not_before - now_secs()).abs() <= 1);

    assert_eq!(
        details.key_usage,
        vec![KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment]
    );
    assert_eq!(details.extended_key_usage, vec![ExtendedKeyUsage::ClientAuth]);

    // 证书绑定的是请求方公钥而非 CA 公钥
    assert_eq!(details.public_key, client_key.public_key_bytes());
    assert_ne!(details.public_key, ca_key.public_key_bytes());
    assert!(details.dns_names.is_empty());

    verify_issued_by(&cert, &root).expect("client cert chains to root");
}

#[test]
fn test_each_issuance_gets_fresh_serial() {
    let (ca_key, root) = root_with_key("tls-sess-demo");
    let client_key = PrivateKey::generate().expect("generate client key");
    let csr = new_csr(&client_key, "alice").expect("build csr");

    let a = sign_csr(&ca_key, &root, &csr, DEFAULT_USER_CERT_TTL).expect("first");
    let b = sign_csr(&ca_key, &root, &csr, DEFAULT_USER_CERT_TTL).expect("second");

    let serial_a = CertificateDetails::from_pem(&a).expect("parse a").serial;
    let serial_b = CertificateDetails::from_pem(&b).expect("parse b").serial;
    assert_ne!(serial_a, serial_b);
}

#[test]
fn test_tampered_csr_signature_issues_nothing() {
    let (ca_key, root) = root_with_key("tls-sess-demo");
    let client_key = PrivateKey::generate().expect("generate client key");
    let csr = new_csr(&client_key, "mallory").expect("build csr");

    let mut der = codec::decode(&csr, PemKind::CertificateRequest).expect("decode csr");
    let last = der.len() - 1;
    der[last] ^= 0xff;
    let tampered = codec::encode(&der, PemKind::CertificateRequest);

    let err = sign_csr(&ca_key, &root, &tampered, DEFAULT_USER_CERT_TTL)
        .expect_err("tampered csr must be rejected");
    assert!(matches!(err, PkiError::SignatureInvalid(_)), "got {err}");
}

#[test]
fn test_sign_csr_rejects_certificate_label() {
    let (ca_key, root) = root_with_key("tls-sess-demo");
    let err = sign_csr(&ca_key, &root, &root, DEFAULT_USER_CERT_TTL)
        .expect_err("certificate is not a CSR");
    assert!(matches!(err, PkiError::Format(_)));
    assert!(err.is_caller_fault());
}

#[test]
fn test_foreign_root_does_not_verify() {
    let (ca_key, root) = root_with_key("tls-sess-demo");
    let (_, other_root) = root_with_key("tls-sess-demo");
    let client_key = PrivateKey::generate().expect("generate client key");
    let csr = new_csr(&client_key, "alice").expect("build csr");

    let cert = sign_csr(&ca_key, &root, &csr, DEFAULT_USER_CERT_TTL).expect("sign csr");
    let err = verify_issued_by(&cert, &other_root).expect_err("different CA key");
    assert!(matches!(err, PkiError::SignatureInvalid(_)));
}

#[test]
fn test_authority_uses_configured_ttl() {
    let ttl = Duration::from_secs(600);
    let ca = CertificateAuthority::generate("tls-sess-demo", ttl).expect("generate CA");
    let client_key = PrivateKey::generate().expect("generate client key");
    let csr = new_csr(&client_key, "bob").expect("build csr");

    let cert = ca.sign(&csr).expect("sign");
    let details = CertificateDetails::from_pem(&cert).expect("parse");
    assert_eq!(details.not_after - details.not_before, 600);
    assert_eq!(details.issuer_common_name.as_deref(), Some(ca.subject()));

    let longer = ca
        .sign_with_ttl(&csr, Duration::from_secs(7200))
        .expect("sign with ttl");
    let details = CertificateDetails::from_pem(&longer).expect("parse");
    assert_eq!(details.not_after - details.not_before, 7200);
}

#[test]
fn test_server_identity_for_gateway() {
    let ca = CertificateAuthority::generate("tls-sess-demo", DEFAULT_USER_CERT_TTL)
        .expect("generate CA");
    let identity = ca
        .issue_server_identity("tls-sess-demo", Duration::from_secs(86400))
        .expect("issue server identity");

    let details = CertificateDetails::from_pem(&identity.cert_pem).expect("parse");
    assert!(!details.is_ca);
    assert_eq!(
        details.dns_names,
        vec!["tls-sess-demo".to_string(), "localhost".to_string()]
    );
    assert_eq!(details.extended_key_usage, vec![ExtendedKeyUsage::ServerAuth]);
    verify_issued_by(&identity.cert_pem, ca.anchor_pem()).expect("chains to anchor");

    let server_key = PrivateKey::from_pem(&identity.key_pem).expect("server key pem");
    assert_eq!(details.public_key, server_key.public_key_bytes());
}

#[test]
fn test_csr_roundtrip_through_verification() {
    let key = PrivateKey::generate().expect("generate key");
    let csr = new_csr(&key, "carol").expect("build csr");
    let request = CertificateRequest::from_pem(&csr).expect("verify csr");
    assert_eq!(request.common_name(), Some("carol"));
    assert_eq!(request.public_key(), key.public_key_bytes().as_slice());
}

fn extension_oids(cert_pem: &str) -> Vec<String> {
    use x509_parser::prelude::{FromDer, X509Certificate};

    let der = codec::decode(cert_pem, PemKind::Certificate).expect("decode cert");
    let (_, cert) = X509Certificate::from_der(&der).expect("parse cert");
    cert.extensions()
        .iter()
        .map(|ext| ext.oid.to_id_string())
        .collect()
}

fn subject_attributes(cert_pem: &str) -> Vec<(String, String)> {
    use x509_parser::prelude::{FromDer, X509Certificate};

    let der = codec::decode(cert_pem, PemKind::Certificate).expect("decode cert");
    let (_, cert) = X509Certificate::from_der(&der).expect("parse cert");
    cert.subject()
        .iter_attributes()
        .map(|attr| {
            (
                attr.attr_type().to_id_string(),
                attr.as_str().expect("string attribute").to_string(),
            )
        })
        .collect()
}

#[test]
fn test_subject_copied_verbatim_and_requested_extensions_ignored() {
    use rcgen::string::{Ia5String, PrintableString};
    use rcgen::{
        CertificateParams, CustomExtension, DnType, DnValue, ExtendedKeyUsagePurpose, KeyPair,
        PKCS_ECDSA_P256_SHA256, SanType,
    };

    let ca = CertificateAuthority::generate("tls-sess-demo", DEFAULT_USER_CERT_TTL)
        .expect("generate CA");

    let client_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("client key");
    let mut params = CertificateParams::default();
    params.distinguished_name.push(
        DnType::CountryName,
        DnValue::PrintableString(PrintableString::try_from("NL").expect("printable")),
    );
    params.distinguished_name.push(DnType::OrganizationName, "Example Org");
    params
        .distinguished_name
        .push(DnType::OrganizationalUnitName, "Platform");
    params.distinguished_name.push(
        DnType::CommonName,
        DnValue::PrintableString(PrintableString::try_from("alice").expect("printable")),
    );
    params.subject_alt_names = vec![SanType::DnsName(
        Ia5String::try_from("evil.example").expect("ia5"),
    )];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.custom_extensions = vec![CustomExtension::from_oid_content(
        &[1, 3, 6, 1, 4, 1, 99999, 1],
        vec![0x05, 0x00],
    )];
    let csr = params
        .serialize_request(&client_key)
        .expect("build csr")
        .pem()
        .expect("encode csr");

    let request = CertificateRequest::from_pem(&csr).expect("csr verifies");
    let cert = ca.sign(&csr).expect("well-formed CSR must be signed");

    let details = CertificateDetails::from_pem(&cert).expect("parse cert");
    assert_eq!(details.subject_raw, request.subject_der());
    assert_eq!(details.public_key, request.public_key());
    assert_eq!(details.extended_key_usage, vec![ExtendedKeyUsage::ClientAuth]);
    assert!(details.dns_names.is_empty());

    let oids = extension_oids(&cert);
    assert!(!oids.contains(&"1.3.6.1.4.1.99999.1".to_string()), "{oids:?}");
    assert!(!oids.contains(&"2.5.29.17".to_string()), "{oids:?}");
    verify_issued_by(&cert, ca.anchor_pem()).expect("chain");
}

/// 手工编码的 DER TLV
fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend([0x81, len as u8]);
    } else {
        out.extend([0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

fn name_attribute(oid: &[u8], tag: u8, value: &str) -> Vec<u8> {
    der(0x30, &[der(0x06, oid), der(tag, value.as_bytes())].concat())
}

#[test]
fn test_multi_valued_rdn_is_signed() {
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::{Signature, SigningKey};
    use p256::pkcs8::EncodePublicKey;

    const OID_CN: &[u8] = &[0x55, 0x04, 0x03];
    const OID_O: &[u8] = &[0x55, 0x04, 0x0a];
    const OID_OU: &[u8] = &[0x55, 0x04, 0x0b];
    const OID_ECDSA_SHA256: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02];

    let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
    let spki = signing_key
        .verifying_key()
        .to_public_key_der()
        .expect("spki der");

    // CN=carol, 以及同一 RDN 中的 OU=Ops + O=Example
    let subject = der(
        0x30,
        &[
            der(0x31, &name_attribute(OID_CN, 0x13, "carol")),
            der(
                0x31,
                &[
                    name_attribute(OID_OU, 0x0c, "Ops"),
                    name_attribute(OID_O, 0x0c, "Example"),
                ]
                .concat(),
            ),
        ]
        .concat(),
    );
    let info = der(
        0x30,
        &[der(0x02, &[0x00]), subject, spki.as_bytes().to_vec(), der(0xa0, &[])].concat(),
    );
    let signature: Signature = signing_key.sign(&info);
    let mut bit_string = vec![0x00];
    bit_string.extend_from_slice(signature.to_der().as_bytes());
    let csr_der = der(
        0x30,
        &[
            info,
            der(0x30, &der(0x06, OID_ECDSA_SHA256)),
            der(0x03, &bit_string),
        ]
        .concat(),
    );
    let csr = codec::encode(&csr_der, PemKind::CertificateRequest);

    let request = CertificateRequest::from_pem(&csr).expect("csr verifies");
    assert_eq!(request.common_name(), Some("carol"));

    let ca = CertificateAuthority::generate("tls-sess-demo", DEFAULT_USER_CERT_TTL)
        .expect("generate CA");
    let cert = ca.sign(&csr).expect("multi-valued RDN must be signed");

    assert_eq!(
        subject_attributes(&cert),
        vec![
            ("2.5.4.3".to_string(), "carol".to_string()),
            ("2.5.4.11".to_string(), "Ops".to_string()),
            ("2.5.4.10".to_string(), "Example".to_string()),
        ]
    );
    let details = CertificateDetails::from_pem(&cert).expect("parse cert");
    assert_eq!(details.public_key, request.public_key());
    verify_issued_by(&cert, ca.anchor_pem()).expect("chain");
}
