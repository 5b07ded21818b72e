//! Services built on the domain types.
//!
//! The pool and the chain walk are pure in-memory operations; the loader is
//! the only service touching the filesystem.

pub mod cert_pool;
pub mod chain_builder;
pub mod loader;

pub use cert_pool::CertPool;
pub use chain_builder::{build_chain, ChainBuilder};
pub use loader::{CandidateLoader, LoadSummary};
