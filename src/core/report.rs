//! Security Report Formatter
//!
//! Turns a merged `SecurityResult` into the chat report: identity, contract
//! security, trading security, holder distribution and risk warnings.
//!
//! Absent upstream values are rendered as unknown and never coerced into
//! a "safe" reading.

use serde::Serialize;

use crate::models::types::{Chain, SecurityResult};
use crate::utils::constants::HIGH_TAX_THRESHOLD_PERCENT;

/// Reply used when neither query returned any data
pub const REPORT_UNAVAILABLE: &str = "无法获取安全分析结果";

const UNKNOWN: &str = "未知";
const GLYPH_UNKNOWN: &str = "❓";

/// One titled block of report lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    /// Rule drawn under the title
    pub rule: String,
    pub lines: Vec<String>,
}

impl ReportSection {
    fn new(title: &str, rule_char: char, rule_width: usize) -> Self {
        Self {
            title: title.to_string(),
            rule: rule_char.to_string().repeat(rule_width),
            lines: Vec::new(),
        }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    fn render(&self) -> String {
        let mut out = Vec::with_capacity(self.lines.len() + 2);
        out.push(self.title.as_str());
        out.push(self.rule.as_str());
        out.extend(self.lines.iter().map(String::as_str));
        out.join("\n")
    }
}

/// Risk lines, in the order they appear in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskWarning {
    Honeypot,
    Proxy,
    NotOpenSource,
    HighBuyTax,
    HighSellTax,
}

impl RiskWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Honeypot => "❌ 高风险: 该代币可能是蜜罐合约",
            Self::Proxy => "⚠️ 注意: 该合约是代理合约",
            Self::NotOpenSource => "⚠️ 注意: 该合约未开源",
            Self::HighBuyTax => "⚠️ 注意: 买入税较高",
            Self::HighSellTax => "⚠️ 注意: 卖出税较高",
        }
    }

    /// Warnings that fire for `result`. Only explicit values count.
    pub fn collect(result: &SecurityResult) -> Vec<RiskWarning> {
        let high_tax = |tax: Option<f64>| tax.is_some_and(|t| t > HIGH_TAX_THRESHOLD_PERCENT);

        let mut warnings = Vec::new();
        if result.is_honeypot() == Some(true) {
            warnings.push(Self::Honeypot);
        }
        if result.is_proxy() == Some(true) {
            warnings.push(Self::Proxy);
        }
        if result.is_open_source() == Some(false) {
            warnings.push(Self::NotOpenSource);
        }
        if high_tax(result.buy_tax_percent()) {
            warnings.push(Self::HighBuyTax);
        }
        if high_tax(result.sell_tax_percent()) {
            warnings.push(Self::HighSellTax);
        }
        warnings
    }
}

/// Structured report, rendered with `render()`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub sections: Vec<ReportSection>,
    pub warnings: Vec<RiskWarning>,
}

impl Report {
    /// `None` when the result carries no data at all
    pub fn from_result(result: &SecurityResult) -> Option<Self> {
        Self::build(result, None)
    }

    /// Like `from_result`; the chain line falls back to the resolved chain
    /// when the records do not name one
    pub fn for_chain(result: &SecurityResult, chain: &Chain) -> Option<Self> {
        Self::build(result, Some(chain))
    }

    fn build(result: &SecurityResult, chain: Option<&Chain>) -> Option<Self> {
        if result.is_empty() {
            return None;
        }

        let token = &result.token;
        let warnings = RiskWarning::collect(result);

        let identity = ReportSection::new("🔍 代币安全分析报告", '=', 30)
            .line(format!("📝 代币名称: {}", text(token.token_name.as_deref())))
            .line(format!("🏷️ 代币符号: {}", text(token.token_symbol.as_deref())))
            .line(format!("⛓️ 链: {}", chain_label(result, chain)));

        // open-source is the only flag where `true` is the good reading
        let contract = ReportSection::new("🔒 合约安全分析", '-', 20)
            .line(format!("📜 是否开源: {}", glyph(result.is_open_source(), "✅", "❌")))
            .line(format!("🔄 是否代理: {}", glyph(result.is_proxy(), "⚠️", "✅")))
            .line(format!("💰 是否可增发: {}", glyph(result.is_mintable(), "⚠️", "✅")))
            .line(format!("🕵️ 是否蜜罐: {}", glyph(result.is_honeypot(), "❌", "✅")));

        let trading = ReportSection::new("💱 交易安全分析", '-', 20)
            .line(format!("📈 买入税: {}", percent(token.buy_tax.as_deref())))
            .line(format!("📉 卖出税: {}", percent(token.sell_tax.as_deref())))
            .line(format!("🔄 转账税: {}", percent(token.transfer_tax.as_deref())));

        let holders = ReportSection::new("👥 持币分布分析", '-', 20)
            .line(format!("👤 持币人数: {}", text(token.holder_count.as_deref())))
            .line(format!(
                "💰 前10持币占比: {}",
                percent(token.top10_holder_rate.as_deref())
            ));

        let mut risks = ReportSection::new("⚠️ 风险提示", '-', 20);
        if warnings.is_empty() {
            risks = risks.line("✅ 未发现明显风险");
        }
        for warning in &warnings {
            risks = risks.line(warning.message());
        }

        Some(Self {
            sections: vec![identity, contract, trading, holders, risks],
            warnings,
        })
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(ReportSection::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Render the chat report for `result`
pub fn format_security_report(result: &SecurityResult) -> String {
    match Report::from_result(result) {
        Some(report) => report.render(),
        None => REPORT_UNAVAILABLE.to_string(),
    }
}

/// Render the chat report for `result`, queried on `chain`
pub fn format_chain_security_report(result: &SecurityResult, chain: &Chain) -> String {
    match Report::for_chain(result, chain) {
        Some(report) => report.render(),
        None => REPORT_UNAVAILABLE.to_string(),
    }
}

fn chain_label(result: &SecurityResult, chain: Option<&Chain>) -> String {
    let recorded = present(result.token.chain_id.as_deref())
        .or_else(|| present(result.contract.chain_id.as_deref()));
    match (recorded, chain) {
        (Some(id), Some(chain)) if id == chain.id => format!("{} ({})", chain.name, chain.id),
        (Some(id), _) => id.to_string(),
        (None, Some(chain)) => format!("{} ({})", chain.name, chain.id),
        (None, None) => UNKNOWN.to_string(),
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text(value: Option<&str>) -> String {
    present(value).unwrap_or(UNKNOWN).to_string()
}

fn percent(value: Option<&str>) -> String {
    match present(value) {
        Some(v) => format!("{}%", v),
        None => UNKNOWN.to_string(),
    }
}

fn glyph(flag: Option<bool>, when_true: &'static str, when_false: &'static str) -> &'static str {
    match flag {
        Some(true) => when_true,
        Some(false) => when_false,
        None => GLYPH_UNKNOWN,
    }
}
