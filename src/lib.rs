//! make-chain library
//!
//! Builds an ordered certificate chain from a leaf certificate up to a
//! self-signed root by matching encoded issuer and subject names against a
//! pool of candidate certificates.
//!
//! Matching is purely structural. No signature, validity period or
//! extension is checked; run a real validator over the result before
//! trusting it.
//!
//! ```no_run
//! use make_chain::{build_chain, pem, CandidateLoader, ChainStatus};
//!
//! # fn example(leaf_pem: &[u8]) -> make_chain::ChainResult<()> {
//! let leaf = pem::read_leaf(leaf_pem)?;
//! let (pool, _summary) = CandidateLoader::new("/etc/pki/ca").load();
//! let outcome = build_chain(&pool, leaf);
//! if outcome.status != ChainStatus::Complete {
//!     eprintln!("chain is {}", outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod infra;
pub mod services;

pub use domain::{
    pem, CertificateChain, ChainOutcome, ChainStatus, DistinguishedName, ParsedCertificate,
};
pub use infra::config::{self, ChainConfiguration, ConfigManager, ExportFormat};
pub use infra::error::{self, ChainError, ChainResult};
pub use services::{build_chain, CandidateLoader, CertPool, ChainBuilder, LoadSummary};

use std::io::Write;

/// Write `chain` as concatenated PEM blocks.
pub fn write_chain_pem<W: Write>(chain: &CertificateChain, out: &mut W) -> ChainResult<()> {
    for cert in chain.iter() {
        out.write_all(pem::encode_certificate(cert).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}
