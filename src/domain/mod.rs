//! Certificate domain types.
//!
//! - Parsed certificates reduced to the fields chain building needs
//! - Ordered chains and the status a walk ended with
//! - PEM framing for reading and writing certificate files

pub mod certificate;
pub mod chain;
pub mod pem;

pub use certificate::{DistinguishedName, ParsedCertificate};
pub use chain::{CertificateChain, ChainOutcome, ChainStatus};
pub use pem::PemBlock;
