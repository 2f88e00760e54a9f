//! Utils Module - Helper Functions & Shared Utilities
//!
//! Shared constants and small helpers used across the bot.

pub mod address;
pub mod constants;

pub use address::*;
pub use constants::*;
