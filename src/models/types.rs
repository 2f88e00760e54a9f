//! Type definitions for the token security bot
//! Chains, upstream security records and parsed chat commands

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A blockchain network as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Provider-assigned identifier ("1", "56", "solana", ...)
    #[serde(deserialize_with = "lenient_required_string")]
    pub id: String,
    /// Display name ("Ethereum", "BSC", ...)
    pub name: String,
}

impl Chain {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One per-address record from a token or contract security query.
///
/// Upstream sends most values as strings ("1", "0.05"), but numbers and
/// booleans show up too. Every known field is normalized to its string form;
/// `None` means the field was absent or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub token_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub token_symbol: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub chain_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_open_source: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_proxy: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_mintable: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_honeypot: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub buy_tax: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sell_tax: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub transfer_tax: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub holder_count: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub top10_holder_rate: Option<String>,
    /// Fields this bot does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SecurityRecord {
    /// True when the record carries no field at all
    pub fn is_empty(&self) -> bool {
        self.token_name.is_none()
            && self.token_symbol.is_none()
            && self.chain_id.is_none()
            && self.is_open_source.is_none()
            && self.is_proxy.is_none()
            && self.is_mintable.is_none()
            && self.is_honeypot.is_none()
            && self.buy_tax.is_none()
            && self.sell_tax.is_none()
            && self.transfer_tax.is_none()
            && self.holder_count.is_none()
            && self.top10_holder_rate.is_none()
            && self.extra.is_empty()
    }
}

/// Parse an upstream boolean flag: "1"/"true" and "0"/"false".
/// Anything else is treated as absent.
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value.map(str::trim) {
        Some("1") => Some(true),
        Some("0") => Some(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Some(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Parse a percentage-like value. Non-numeric input is absent, never zero.
pub fn parse_percent(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Merged token + contract security data for one (chain, address) query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityResult {
    pub token: SecurityRecord,
    pub contract: SecurityRecord,
}

impl SecurityResult {
    pub fn new(token: SecurityRecord, contract: SecurityRecord) -> Self {
        Self { token, contract }
    }

    /// No data from either query
    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.contract.is_empty()
    }

    /// Contract flag with fallback to the token record (token_security
    /// carries the same fields).
    fn contract_flag(&self, pick: fn(&SecurityRecord) -> &Option<String>) -> Option<bool> {
        parse_flag(pick(&self.contract).as_deref()).or_else(|| parse_flag(pick(&self.token).as_deref()))
    }

    pub fn is_open_source(&self) -> Option<bool> {
        self.contract_flag(|r| &r.is_open_source)
    }

    pub fn is_proxy(&self) -> Option<bool> {
        self.contract_flag(|r| &r.is_proxy)
    }

    pub fn is_mintable(&self) -> Option<bool> {
        self.contract_flag(|r| &r.is_mintable)
    }

    pub fn is_honeypot(&self) -> Option<bool> {
        self.contract_flag(|r| &r.is_honeypot)
    }

    pub fn buy_tax_percent(&self) -> Option<f64> {
        parse_percent(self.token.buy_tax.as_deref())
    }

    pub fn sell_tax_percent(&self) -> Option<f64> {
        parse_percent(self.token.sell_tax.as_deref())
    }
}

/// Parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show supported chains
    ListChains,
    /// Check a token on a chain
    CheckToken { chain_name: String, address: String },
    /// Show usage
    Help,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::ListChains => "list_chains",
            Command::CheckToken { .. } => "check_token",
            Command::Help => "help",
        }
    }
}

// ============================================
// Serde helpers
// ============================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Other(serde_json::Value),
}

impl Scalar {
    fn into_string(self) -> Option<String> {
        match self {
            Scalar::Str(s) => Some(s),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
            Scalar::Other(serde_json::Value::Null) => None,
            Scalar::Other(other) => Some(other.to_string()),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.and_then(Scalar::into_string))
}

fn lenient_required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected a string or number, got null"))
}
