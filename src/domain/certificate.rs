//! Parsed certificate representation consumed by the pool and the chain walk.

use std::fmt;
use std::hash::{Hash, Hasher};

use der::oid::AssociatedOid;
use der::{Decode, Encode};
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::infra::error::{ChainError, ChainResult};

/// DER-encoded distinguished name with a human-readable rendering.
///
/// Equality and hashing only look at the encoded bytes; the rendering is for
/// log output.
#[derive(Clone)]
pub struct DistinguishedName {
    der: Vec<u8>,
    display: String,
}

impl DistinguishedName {
    #[must_use]
    pub fn new(der: Vec<u8>, display: impl Into<String>) -> Self {
        Self {
            der,
            display: display.into(),
        }
    }

    fn from_name(name: &Name) -> ChainResult<Self> {
        let der = name.to_der()?;
        Ok(Self {
            der,
            display: name.to_string(),
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for DistinguishedName {}

impl Hash for DistinguishedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display.is_empty() {
            write!(f, "DN[{}]", hex::encode(&self.der))
        } else {
            f.write_str(&self.display)
        }
    }
}

impl fmt::Debug for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DistinguishedName({self})")
    }
}

/// A certificate reduced to the fields chain building needs.
///
/// `raw` is the exact encoding the certificate was read from and is what gets
/// written back out.
#[derive(Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    raw: Box<[u8]>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    subject_key_id: Option<Box<[u8]>>,
}

impl ParsedCertificate {
    /// Parse a DER-encoded X.509 certificate.
    pub fn from_der(der: &[u8]) -> ChainResult<Self> {
        let certificate = Certificate::from_der(der).map_err(|e| {
            ChainError::InvalidCertificate(format!("failed to parse DER certificate: {e}"))
        })?;
        Self::from_x509(der, &certificate)
    }

    /// Build from an already decoded certificate. `der` must be the encoding
    /// `certificate` was decoded from.
    pub fn from_x509(der: &[u8], certificate: &Certificate) -> ChainResult<Self> {
        let tbs = &certificate.tbs_certificate;
        let subject = DistinguishedName::from_name(&tbs.subject)?;
        let issuer = DistinguishedName::from_name(&tbs.issuer)?;
        let subject_key_id = extract_subject_key_id(certificate)?;

        Ok(Self {
            raw: der.into(),
            subject,
            issuer,
            subject_key_id: subject_key_id.map(Vec::into_boxed_slice),
        })
    }

    /// Assemble a certificate from fields decoded elsewhere.
    #[must_use]
    pub fn from_parts(
        raw: Vec<u8>,
        subject: DistinguishedName,
        issuer: DistinguishedName,
        subject_key_id: Option<Vec<u8>>,
    ) -> Self {
        Self {
            raw: raw.into_boxed_slice(),
            subject,
            issuer,
            subject_key_id: subject_key_id.map(Vec::into_boxed_slice),
        }
    }

    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    #[must_use]
    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    #[must_use]
    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    /// Subject and issuer encodings are byte-identical.
    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.subject.as_der() == self.issuer.as_der()
    }
}

impl fmt::Debug for ParsedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParsedCertificate(subject={}, issuer={}, len={})",
            self.subject,
            self.issuer,
            self.raw.len()
        )
    }
}

fn extract_subject_key_id(certificate: &Certificate) -> ChainResult<Option<Vec<u8>>> {
    let Some(extensions) = &certificate.tbs_certificate.extensions else {
        return Ok(None);
    };

    for extension in extensions {
        if extension.extn_id == SubjectKeyIdentifier::OID {
            let ski = SubjectKeyIdentifier::from_der(extension.extn_value.as_bytes())?;
            let key_id = ski.0.as_bytes().to_vec();
            if key_id.is_empty() {
                return Ok(None);
            }
            return Ok(Some(key_id));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(tag: u8, name: &str) -> DistinguishedName {
        DistinguishedName::new(vec![0x30, 0x01, tag], name)
    }

    #[test]
    fn self_signed_compares_encoded_names() {
        let root = ParsedCertificate::from_parts(vec![1], dn(1, "CN=Root"), dn(1, "CN=Root"), None);
        assert!(root.is_self_signed());

        let leaf = ParsedCertificate::from_parts(vec![2], dn(2, "CN=Leaf"), dn(1, "CN=Root"), None);
        assert!(!leaf.is_self_signed());
    }

    #[test]
    fn rendering_does_not_affect_equality() {
        assert_eq!(dn(7, "CN=One"), dn(7, "cn=one"));
        assert_ne!(dn(7, "CN=One"), dn(8, "CN=One"));
    }

    #[test]
    fn empty_rendering_falls_back_to_hex() {
        let name = DistinguishedName::new(vec![0x30, 0x00], "");
        assert_eq!(name.to_string(), "DN[3000]");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = ParsedCertificate::from_der(&[0x30, 0x03, 0x02, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, ChainError::InvalidCertificate(_)));
    }

    #[test]
    fn key_id_is_optional() {
        let with = ParsedCertificate::from_parts(vec![1], dn(1, "a"), dn(1, "a"), Some(vec![9, 9]));
        assert_eq!(with.subject_key_id(), Some(&[9u8, 9][..]));

        let without = ParsedCertificate::from_parts(vec![1], dn(1, "a"), dn(1, "a"), None);
        assert_eq!(without.subject_key_id(), None);
    }
}
