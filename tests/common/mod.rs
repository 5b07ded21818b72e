//! Certificate fixtures for integration tests.
//!
//! Certificates are minted with `rcgen` so they carry real DER-encoded names
//! that `x509-cert` parses the same way it would parse production inputs.

#![allow(dead_code)]

use make_chain::ParsedCertificate;
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};

/// A minted certificate together with its key, so it can issue others.
pub struct Authority {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl Authority {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn parsed(&self) -> ParsedCertificate {
        ParsedCertificate::from_der(&self.der()).expect("rcgen output parses")
    }
}

fn params(common_name: &str, ca: bool) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("valid params");
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
        .distinguished_name
        .push(DnType::OrganizationName, "make-chain tests");
    params.is_ca = if ca {
        IsCa::Ca(BasicConstraints::Unconstrained)
    } else {
        IsCa::NoCa
    };
    params
}

/// Self-signed CA.
pub fn root(common_name: &str) -> Authority {
    let key = KeyPair::generate().expect("key generation");
    let cert = params(common_name, true)
        .self_signed(&key)
        .expect("self-signed certificate");
    Authority { cert, key }
}

/// Certificate named `common_name` issued by `issuer`.
pub fn issue(common_name: &str, ca: bool, issuer: &Authority) -> Authority {
    let key = KeyPair::generate().expect("key generation");
    let cert = params(common_name, ca)
        .signed_by(&key, &issuer.cert, &issuer.key)
        .expect("issued certificate");
    Authority { cert, key }
}

/// Two CAs that issued each other, with no self-signed member.
pub fn cross_signed_pair(a_name: &str, b_name: &str) -> (Authority, Authority) {
    let a_key = KeyPair::generate().expect("key generation");
    let b_key = KeyPair::generate().expect("key generation");

    // Throwaway self-signed anchors only provide the issuer names and keys.
    let a_anchor = params(a_name, true).self_signed(&a_key).expect("anchor");
    let b_anchor = params(b_name, true).self_signed(&b_key).expect("anchor");

    let a = params(a_name, true)
        .signed_by(&a_key, &b_anchor, &b_key)
        .expect("cross certificate");
    let b = params(b_name, true)
        .signed_by(&b_key, &a_anchor, &a_key)
        .expect("cross certificate");

    (
        Authority { cert: a, key: a_key },
        Authority { cert: b, key: b_key },
    )
}

/// Root, intermediate and leaf: leaf <- intermediate <- root.
pub fn three_tier() -> (Authority, Authority, Authority) {
    let root = root("Test Root CA");
    let intermediate = issue("Test Intermediate CA", true, &root);
    let leaf = issue("leaf.example.com", false, &intermediate);
    (root, intermediate, leaf)
}

/// Re-frame a single-certificate PEM with its base64 body wrapped at `width`
/// columns and `line_suffix` appended to every body line.
pub fn rewrap_pem(pem: &str, width: usize, line_suffix: &str) -> String {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();

    let mut out = String::from("-----BEGIN CERTIFICATE-----\n");
    for chunk in body.as_bytes().chunks(width) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 is ascii"));
        out.push_str(line_suffix);
        out.push('\n');
    }
    out.push_str("-----END CERTIFICATE-----\n");
    out
}
