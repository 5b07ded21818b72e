//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides configuration loading and the error types shared by every layer.

pub mod config;
pub mod error;
