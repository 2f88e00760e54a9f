//! Ruster Shield Library
//!
//! Chat-bot token security checker backed by the GoPlus risk API:
//! - Chain name resolution with an hourly-refreshed chain list
//! - Memoized token + contract security queries
//! - Risk-annotated text reports (honeypot, proxy, open source, taxes)
//! - Command routing for free-text chat messages

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    format_chain_security_report, format_security_report, parse_command, ChainRegistry, ChainSnapshot, CommandRouter, Report,
    RiskWarning, SecurityQueryCache,
};
pub use models::{AppError, AppResult, BotConfig, Chain, Command, ErrorCode, SecurityRecord, SecurityResult};
pub use providers::{GoPlusClient, InMemoryProvider, SecurityProvider};
