//! Providers Module - External Data Sources
//!
//! Upstream security data (GoPlus) behind the `SecurityProvider` trait, plus
//! an in-memory provider for offline runs.

pub mod goplus;
pub mod memory;

pub use goplus::*;
pub use memory::*;
