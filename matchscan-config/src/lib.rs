//! Configuration for matchscan processes.
//!
//! [`MatchScanConfig`] is read from a TOML or JSON file, an inline JSON
//! environment variable or built-in defaults. [`SharedScannerConfig`] keeps
//! the loaded value behind a lock so operators can retune a running scanner
//! by editing the file and reloading.
#![allow(missing_docs)]

pub mod models;
pub mod shared;

pub use models::{ConfigFormat, ConfigSource, MatchScanConfig};
pub use shared::SharedScannerConfig;
