//! Core Module - Business Logic
//!
//! Chain resolution, memoized security queries, report formatting and
//! command routing. Everything upstream goes through `SecurityProvider`.

pub mod chain_registry;
pub mod report;
pub mod router;
pub mod security_cache;

pub use chain_registry::*;
pub use report::*;
pub use router::*;
pub use security_cache::*;
