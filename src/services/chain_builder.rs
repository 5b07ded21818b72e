//! Leaf-to-root chain walk over a [`CertPool`].
//!
//! Matching is structural: a certificate's issuer is the first pooled
//! certificate, in insertion order, whose encoded subject equals the encoded
//! issuer name. Signatures, validity periods and key identifiers are not
//! consulted, so the result still needs a separate validation pass before it
//! can be trusted.

use std::collections::HashSet;

use crate::domain::certificate::ParsedCertificate;
use crate::domain::chain::{CertificateChain, ChainOutcome, ChainStatus};
use crate::services::cert_pool::CertPool;

/// Builds chains against a populated pool. The pool is only read.
#[derive(Debug, Clone, Copy)]
pub struct ChainBuilder<'a> {
    pool: &'a CertPool,
}

impl<'a> ChainBuilder<'a> {
    #[must_use]
    pub fn new(pool: &'a CertPool) -> Self {
        Self { pool }
    }

    /// Walk from `leaf` towards a self-signed root.
    ///
    /// Exactly one path is followed. The walk stops at the first self-signed
    /// certificate, when no issuer is found, or when the next issuer is
    /// already in the chain.
    #[must_use]
    pub fn build(&self, leaf: ParsedCertificate) -> ChainOutcome {
        log::debug!("building chain for: {}", leaf.subject());

        let mut visited: HashSet<Box<[u8]>> = HashSet::new();
        visited.insert(leaf.raw().into());

        if leaf.is_self_signed() {
            log::debug!("leaf is self-signed: {}", leaf.subject());
            return ChainOutcome {
                chain: CertificateChain::new(leaf),
                status: ChainStatus::Complete,
            };
        }

        let mut chain = CertificateChain::new(leaf);

        let status = loop {
            let current = chain.last();
            let Some(parent) = self.find_issuer(current) else {
                log::debug!("no issuer found for: {}", current.subject());
                break ChainStatus::Incomplete;
            };

            if !visited.insert(parent.raw().into()) {
                log::warn!(
                    "issuer {} is already part of the chain, stopping",
                    parent.subject()
                );
                break ChainStatus::CycleDetected;
            }

            log::debug!("found chain cert: {}", parent.subject());
            let is_root = parent.is_self_signed();
            chain.push(parent.clone());

            if is_root {
                log::debug!("found the root CA: {}", chain.last().subject());
                break ChainStatus::Complete;
            }
        };

        ChainOutcome { chain, status }
    }

    /// First pooled certificate, in insertion order, whose subject is
    /// `cert`'s issuer.
    fn find_issuer(&self, cert: &ParsedCertificate) -> Option<&'a ParsedCertificate> {
        let candidates = self.pool.find_by_subject(cert.issuer().as_der());
        if candidates.len() > 1 {
            log::debug!(
                "{} candidates share subject {}, using the first loaded",
                candidates.len(),
                cert.issuer()
            );
        }
        candidates.first().copied()
    }
}

/// Walk from `leaf` to a root using the certificates in `pool`.
#[must_use]
pub fn build_chain(pool: &CertPool, leaf: ParsedCertificate) -> ChainOutcome {
    ChainBuilder::new(pool).build(leaf)
}
