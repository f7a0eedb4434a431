//! Strata common types, errors, and configuration.
//!
//! This crate provides shared definitions used by the index crates.

pub mod config;
pub mod error;
pub mod key;

pub use config::{BloomConfig, CompactionConfig, IndexConfig};
pub use error::{Result, StrataError};
pub use key::FixedWidthKey;
