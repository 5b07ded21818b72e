//! In-memory certificate pool indexed by subject and subject key id.
//!
//! The pool is append-only. Insertion order is preserved and is the order
//! every lookup returns results in, which makes it the tie-break when several
//! certificates share a subject.

use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::domain::certificate::ParsedCertificate;
use crate::domain::pem;

/// A set of candidate certificates.
#[derive(Debug, Default, Clone)]
pub struct CertPool {
    certs: Vec<ParsedCertificate>,
    by_subject: HashMap<Vec<u8>, Vec<usize>>,
    by_key_id: HashMap<Vec<u8>, Vec<usize>>,
}

impl CertPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a certificate with the same encoding is already stored.
    ///
    /// Only certificates sharing `cert`'s subject are compared.
    #[must_use]
    pub fn contains(&self, cert: &ParsedCertificate) -> bool {
        self.by_subject
            .get(cert.subject().as_der())
            .is_some_and(|indices| indices.iter().any(|&i| self.certs[i].raw() == cert.raw()))
    }

    /// Add a certificate. Adding a byte-identical certificate again is a
    /// no-op; the return value says whether the pool grew.
    pub fn add(&mut self, cert: ParsedCertificate) -> bool {
        if self.contains(&cert) {
            log::debug!("skipping duplicate certificate: {}", cert.subject());
            return false;
        }

        let n = self.certs.len();

        if let Some(key_id) = cert.subject_key_id() {
            self.by_key_id.entry(key_id.to_vec()).or_default().push(n);
        }

        self.by_subject
            .entry(cert.subject().as_der().to_vec())
            .or_default()
            .push(n);

        self.certs.push(cert);
        true
    }

    /// Parse every `CERTIFICATE` block in `pem_certs` and add it.
    ///
    /// Blocks that fail to decode or parse are skipped. Returns how many
    /// blocks parsed, duplicates included.
    pub fn append_certs_from_pem(&mut self, pem_certs: &[u8]) -> usize {
        let mut parsed = 0;
        for result in pem::decode_certificates(pem_certs) {
            match result {
                Ok(cert) => {
                    self.add(cert);
                    parsed += 1;
                }
                Err(e) => log::debug!("skipping unparseable certificate block: {e}"),
            }
        }
        parsed
    }

    /// All certificates whose subject encoding equals `subject`, in insertion
    /// order.
    #[must_use]
    pub fn find_by_subject(&self, subject: &[u8]) -> Vec<&ParsedCertificate> {
        self.lookup(&self.by_subject, subject)
    }

    /// All certificates carrying subject key id `key_id`, in insertion order.
    #[must_use]
    pub fn find_by_key_id(&self, key_id: &[u8]) -> Vec<&ParsedCertificate> {
        self.lookup(&self.by_key_id, key_id)
    }

    fn lookup<'a>(
        &'a self,
        index: &HashMap<Vec<u8>, Vec<usize>>,
        key: &[u8],
    ) -> Vec<&'a ParsedCertificate> {
        index
            .get(key)
            .map(|indices| indices.iter().map(|&i| &self.certs[i]).collect())
            .unwrap_or_default()
    }

    /// Visit every certificate in insertion order until `visit` breaks.
    pub fn for_each<'a, B, F>(&'a self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&'a ParsedCertificate) -> ControlFlow<B>,
    {
        for cert in &self.certs {
            if let ControlFlow::Break(b) = visit(cert) {
                return ControlFlow::Break(b);
            }
        }
        ControlFlow::Continue(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedCertificate> {
        self.certs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

impl Extend<ParsedCertificate> for CertPool {
    fn extend<I: IntoIterator<Item = ParsedCertificate>>(&mut self, iter: I) {
        for cert in iter {
            self.add(cert);
        }
    }
}

impl FromIterator<ParsedCertificate> for CertPool {
    fn from_iter<I: IntoIterator<Item = ParsedCertificate>>(iter: I) -> Self {
        let mut pool = CertPool::new();
        pool.extend(iter);
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::certificate::DistinguishedName;

    fn name(tag: u8) -> DistinguishedName {
        DistinguishedName::new(vec![0x30, 0x01, tag], format!("CN=n{tag}"))
    }

    fn cert(raw: &[u8], subject: u8, issuer: u8, key_id: Option<&[u8]>) -> ParsedCertificate {
        ParsedCertificate::from_parts(
            raw.to_vec(),
            name(subject),
            name(issuer),
            key_id.map(<[u8]>::to_vec),
        )
    }

    #[test]
    fn duplicate_insert_is_idempotent() {
        let mut pool = CertPool::new();
        assert!(pool.add(cert(b"a", 1, 1, None)));
        assert!(!pool.add(cert(b"a", 1, 1, None)));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.find_by_subject(name(1).as_der()).len(), 1);
    }

    #[test]
    fn same_subject_different_encoding_is_kept() {
        let mut pool = CertPool::new();
        pool.add(cert(b"first", 1, 1, None));
        pool.add(cert(b"second", 1, 1, None));

        let found = pool.find_by_subject(name(1).as_der());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw(), b"first");
        assert_eq!(found[1].raw(), b"second");
    }

    #[test]
    fn duplicate_detection_is_scoped_to_subject() {
        // Same bytes under another subject are not considered the same cert.
        let mut pool = CertPool::new();
        pool.add(cert(b"x", 1, 1, None));
        assert!(pool.add(cert(b"x", 2, 2, None)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn unknown_subject_yields_nothing() {
        let pool: CertPool = vec![cert(b"a", 1, 1, None)].into_iter().collect();
        assert!(pool.find_by_subject(name(9).as_der()).is_empty());
    }

    #[test]
    fn key_id_index_only_holds_certs_with_key_ids() {
        let mut pool = CertPool::new();
        pool.add(cert(b"a", 1, 1, Some(&b"k1"[..])));
        pool.add(cert(b"b", 2, 1, None));
        pool.add(cert(b"c", 3, 1, Some(&b"k1"[..])));

        let found = pool.find_by_key_id(b"k1");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw(), b"a");
        assert_eq!(found[1].raw(), b"c");
        assert!(pool.find_by_key_id(b"k2").is_empty());
    }

    #[test]
    fn for_each_visits_in_insertion_order() {
        let pool: CertPool = [b"c", b"a", b"b"]
            .into_iter()
            .enumerate()
            .map(|(i, raw)| cert(raw, i as u8, 0, None))
            .collect();

        let mut seen = Vec::new();
        let flow: ControlFlow<()> = pool.for_each(|c| {
            seen.push(c.raw().to_vec());
            ControlFlow::Continue(())
        });

        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(seen, vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn for_each_propagates_break() {
        let pool: CertPool = (0..5).map(|i| cert(&[i], i, 0, None)).collect();

        let mut visited = 0;
        let flow = pool.for_each(|c| {
            visited += 1;
            if c.raw()[0] == 2 {
                ControlFlow::Break(c.raw()[0])
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(flow, ControlFlow::Break(2));
        assert_eq!(visited, 3);
    }

    #[test]
    fn pem_garbage_is_skipped() {
        let mut pool = CertPool::new();
        let input = b"-----BEGIN CERTIFICATE-----\nAQID\n-----END CERTIFICATE-----\nnot pem at all";
        assert_eq!(pool.append_certs_from_pem(input), 0);
        assert!(pool.is_empty());
    }
}
