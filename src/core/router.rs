//! Command Router
//!
//! Parses free-text chat messages into a `Command` and answers them with a
//! reply string. Every upstream failure is caught here and turned into a
//! short localized message.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::chain_registry::ChainRegistry;
use super::report::format_chain_security_report;
use super::security_cache::SecurityQueryCache;
use crate::models::config::BotConfig;
use crate::models::errors::AppError;
use crate::models::types::Command;
use crate::providers::SecurityProvider;
use crate::utils::address::short_address;
use crate::utils::constants::{CHECK_COMMAND_PATTERN, LIST_CHAINS_SYNONYMS, SECURITY_MEMO_CAPACITY};

lazy_static! {
    static ref CHECK_COMMAND: Regex = Regex::new(CHECK_COMMAND_PATTERN)
        .unwrap_or_else(|e| panic!("invalid check command pattern: {}", e));
}

/// Usage text returned for anything that is not a known command
pub const HELP_TEXT: &str = "欢迎使用代币安全检查机器人！\n\n\
可用命令：\n\
• 检查 [链名称] [代币地址] - 检查代币安全性\n\
• 链列表 - 查看支持的链\n\n\
示例：\n\
• 检查 eth 0x1234567890123456789012345678901234567890\n\
• check bsc 0x1234567890123456789012345678901234567890";

/// Parse a chat message. First match wins: list synonyms, check pattern, help.
pub fn parse_command(message: &str) -> Command {
    let normalized = message.trim().to_lowercase();
    if LIST_CHAINS_SYNONYMS.contains(&normalized.as_str()) {
        return Command::ListChains;
    }

    if let Some(caps) = CHECK_COMMAND.captures(message) {
        return Command::CheckToken {
            chain_name: caps[1].to_string(),
            address: caps[2].to_string(),
        };
    }

    Command::Help
}

pub struct CommandRouter {
    registry: Arc<ChainRegistry>,
    security: Arc<SecurityQueryCache>,
}

impl CommandRouter {
    pub fn new(registry: Arc<ChainRegistry>, security: Arc<SecurityQueryCache>) -> Self {
        Self { registry, security }
    }

    /// Wire registry + memo on top of one provider
    pub fn from_provider(provider: Arc<dyn SecurityProvider>, config: &BotConfig) -> Self {
        let registry = Arc::new(ChainRegistry::new(provider.clone()));
        let security = Arc::new(SecurityQueryCache::with_options(
            provider,
            SECURITY_MEMO_CAPACITY,
            config.query_timeout,
        ));
        Self::new(registry, security)
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn security(&self) -> &Arc<SecurityQueryCache> {
        &self.security
    }

    /// Parse and answer one message
    pub async fn handle_message(&self, message: &str) -> String {
        let command = parse_command(message);
        info!("📨 Command: {}", command.as_str());
        self.dispatch(command).await
    }

    pub async fn dispatch(&self, command: Command) -> String {
        match command {
            Command::ListChains => self.registry.format_chain_list().await,
            Command::CheckToken {
                chain_name,
                address,
            } => self.check_token(&chain_name, &address).await,
            Command::Help => HELP_TEXT.to_string(),
        }
    }

    async fn check_token(&self, chain_name: &str, address: &str) -> String {
        let chain = match self.registry.find_chain(chain_name).await {
            Some(chain) => chain,
            None => {
                let err = AppError::chain_not_found(chain_name);
                warn!(code = err.code_str(), "🔎 {}", err);
                return format!("未找到链：{}", chain_name);
            }
        };

        info!(
            "🔍 Checking {} on {} (ID: {})",
            short_address(address),
            chain.name,
            chain.id
        );

        match self.security.check_token_security(&chain.id, address).await {
            Ok(result) => format_chain_security_report(&result, &chain),
            Err(e) => {
                error!(code = e.code_str(), "❌ Token check failed: {}", e);
                format!("检查过程中出错：{}", e.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::SecurityRecord;
    use crate::providers::InMemoryProvider;

    const TOKEN: &str = "0x1234567890123456789012345678901234567890";

    fn router(provider: Arc<InMemoryProvider>) -> CommandRouter {
        CommandRouter::from_provider(provider, &BotConfig::default())
    }

    #[test]
    fn test_parse_list_chains() {
        assert_eq!(parse_command("链列表"), Command::ListChains);
        assert_eq!(parse_command("  Chains "), Command::ListChains);
        assert_eq!(parse_command("LIST"), Command::ListChains);
    }

    #[test]
    fn test_parse_check_token() {
        let expected = Command::CheckToken {
            chain_name: "eth".into(),
            address: TOKEN.into(),
        };
        assert_eq!(parse_command(&format!("检查 eth {}", TOKEN)), expected);
        assert_eq!(parse_command(&format!("请帮我 CHECK eth   {}", TOKEN)), expected);
    }

    #[test]
    fn test_parse_help() {
        assert_eq!(parse_command("random text"), Command::Help);
        assert_eq!(parse_command("检查 eth 0x1234"), Command::Help);
        assert_eq!(parse_command(""), Command::Help);
    }

    #[tokio::test]
    async fn test_help_reply() {
        let router = router(Arc::new(InMemoryProvider::with_default_chains()));
        let reply = router.handle_message("hello").await;
        assert_eq!(reply, HELP_TEXT);
        assert!(reply.contains("链列表"));
    }

    #[tokio::test]
    async fn test_list_chains_reply() {
        let router = router(Arc::new(InMemoryProvider::with_default_chains()));
        let reply = router.handle_message("chains").await;
        assert!(reply.contains("• Ethereum (ID: 1)"));
        assert!(reply.contains("• BSC (ID: 56)"));
    }

    #[tokio::test]
    async fn test_unknown_chain_skips_security_query() {
        let provider = Arc::new(InMemoryProvider::with_default_chains());
        let router = router(provider.clone());

        let reply = router
            .handle_message(&format!("检查 nonexistent {}", TOKEN))
            .await;
        assert_eq!(reply, "未找到链：nonexistent");
        assert_eq!(provider.security_calls(), 0);
        assert_eq!(router.security().stats().misses, 0);
    }

    #[tokio::test]
    async fn test_check_token_renders_report() {
        let provider = Arc::new(InMemoryProvider::with_default_chains().with_token(
            "1",
            TOKEN,
            SecurityRecord {
                token_symbol: Some("TRAP".into()),
                is_honeypot: Some("1".into()),
                ..Default::default()
            },
        ));
        let router = router(provider);

        let reply = router.handle_message(&format!("检查 eth {}", TOKEN)).await;
        assert!(reply.contains("🏷️ 代币符号: TRAP"));
        assert!(reply.contains("⛓️ 链: Ethereum (1)"));
        assert!(reply.contains("❌ 高风险: 该代币可能是蜜罐合约"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_localized() {
        let provider = Arc::new(InMemoryProvider::with_default_chains());
        provider.set_fail_security(true);
        let router = router(provider);

        let reply = router.handle_message(&format!("check bsc {}", TOKEN)).await;
        assert_eq!(reply, "检查过程中出错：安全服务暂时不可用，请稍后重试");
        assert!(!reply.contains("in-memory"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unavailable() {
        let router = router(Arc::new(InMemoryProvider::with_default_chains()));
        let reply = router.handle_message(&format!("检查 base {}", TOKEN)).await;
        assert_eq!(reply, "无法获取安全分析结果");
    }
}
