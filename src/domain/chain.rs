//! Certificate chain produced by a walk, plus how the walk ended.

use std::fmt;

use crate::domain::certificate::ParsedCertificate;

/// Terminal state of a chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// The chain ends in a self-signed root.
    Complete,
    /// No issuer for the last certificate was found in the pool.
    Incomplete,
    /// The next issuer is already part of the chain.
    CycleDetected,
}

impl ChainStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStatus::Complete => "complete",
            ChainStatus::Incomplete => "incomplete",
            ChainStatus::CycleDetected => "cycle-detected",
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, ChainStatus::Complete)
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered certificate chain, leaf first. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<ParsedCertificate>,
}

impl CertificateChain {
    #[must_use]
    pub fn new(leaf: ParsedCertificate) -> Self {
        Self {
            certificates: vec![leaf],
        }
    }

    pub fn push(&mut self, cert: ParsedCertificate) {
        self.certificates.push(cert);
    }

    #[must_use]
    pub fn leaf(&self) -> &ParsedCertificate {
        &self.certificates[0]
    }

    /// Last certificate in the chain; the root when the walk completed.
    #[must_use]
    pub fn last(&self) -> &ParsedCertificate {
        &self.certificates[self.certificates.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedCertificate> {
        self.certificates.iter()
    }
}

impl fmt::Debug for CertificateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.certificates.iter().map(|c| c.subject()))
            .finish()
    }
}

/// Chain plus the status the walk ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    pub chain: CertificateChain,
    pub status: ChainStatus,
}

impl ChainOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}
