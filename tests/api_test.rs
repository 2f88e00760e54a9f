//! Webhook API tests
//!
//! Exercise the axum router in-process with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ruster_shield::api::{create_router, handlers::HANDLER_FAILURE_REPLY, ApiResponse, AppState, WebhookReplyData};
use ruster_shield::providers::RecordMap;
use ruster_shield::{
    AppResult, BotConfig, Chain, CommandRouter, InMemoryProvider, SecurityProvider,
    SecurityRecord,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TOKEN: &str = "0x1234567890123456789012345678901234567890";

fn app_with(provider: Arc<dyn SecurityProvider>, config: BotConfig) -> Router {
    let router = Arc::new(CommandRouter::from_provider(provider, &config));
    create_router(Arc::new(AppState::new(router, config)))
}

fn app(config: BotConfig) -> Router {
    let provider = InMemoryProvider::with_default_chains().with_contract(
        "1",
        TOKEN,
        SecurityRecord {
            is_honeypot: Some("1".into()),
            ..Default::default()
        },
    );
    app_with(Arc::new(provider), config)
}

fn message(content: &str) -> Request<Body> {
    let body = serde_json::json!({ "sender_id": "ou_123", "content": content });
    Request::builder()
        .method("POST")
        .uri("/v1/webhook/message")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn error_code_of(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: ApiResponse<()> = serde_json::from_slice(&bytes).unwrap();
    assert!(!parsed.success);
    parsed.error.unwrap().code
}

async fn reply_of(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: ApiResponse<WebhookReplyData> = serde_json::from_slice(&bytes).unwrap();
    assert!(parsed.success);
    parsed.data.unwrap().reply
}

#[tokio::test]
async fn test_health_is_public() {
    let config = BotConfig {
        verification_token: Some("secret".into()),
        ..BotConfig::default()
    };
    let response = app(config)
        .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_webhook_returns_report() {
    let response = app(BotConfig::default())
        .oneshot(message(&format!("检查 eth {}", TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = reply_of(response).await;
    assert!(reply.contains("❌ 高风险: 该代币可能是蜜罐合约"));
}

#[tokio::test]
async fn test_webhook_help() {
    let response = app(BotConfig::default())
        .oneshot(message("你好"))
        .await
        .unwrap();
    let reply = reply_of(response).await;
    assert!(reply.starts_with("欢迎使用代币安全检查机器人"));
}

#[tokio::test]
async fn test_verification_token() {
    let config = BotConfig {
        verification_token: Some("secret".into()),
        ..BotConfig::default()
    };
    let app = app(config);

    let missing = app.clone().oneshot(message("chains")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code_of(missing).await, "API_UNAUTHORIZED");

    let mut wrong = message("chains");
    wrong
        .headers_mut()
        .insert("X-Verification-Token", "nope".parse().unwrap());
    let wrong = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code_of(wrong).await, "API_UNAUTHORIZED");

    let mut right = message("chains");
    right
        .headers_mut()
        .insert("X-Verification-Token", "secret".parse().unwrap());
    let right = app.oneshot(right).await.unwrap();
    assert_eq!(right.status(), StatusCode::OK);
    assert!(reply_of(right).await.contains("• Ethereum (ID: 1)"));
}

#[tokio::test]
async fn test_rate_limit() {
    let config = BotConfig {
        rate_limit_per_minute: 2,
        ..BotConfig::default()
    };
    let app = app(config);

    let from = |ip: &str| {
        let mut request = message("help");
        request
            .headers_mut()
            .insert("X-Forwarded-For", ip.parse().unwrap());
        request
    };

    assert_eq!(app.clone().oneshot(from("10.0.0.1")).await.unwrap().status(), StatusCode::OK);
    assert_eq!(app.clone().oneshot(from("10.0.0.1")).await.unwrap().status(), StatusCode::OK);
    let limited = app.clone().oneshot(from("10.0.0.1")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));
    assert_eq!(error_code_of(limited).await, "API_RATE_LIMITED");
    assert_eq!(app.oneshot(from("10.0.0.2")).await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_sender_rejected() {
    let body = serde_json::json!({ "sender_id": " ", "content": "chains" });
    let request = Request::builder()
        .method("POST")
        .uri("/v1/webhook/message")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app(BotConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Panics on the first chain list call, behaves afterwards
struct FlakyProvider {
    panicked: AtomicBool,
    inner: InMemoryProvider,
}

#[async_trait]
impl SecurityProvider for FlakyProvider {
    async fn chain_list(&self) -> AppResult<Vec<Chain>> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("chain list exploded");
        }
        self.inner.chain_list().await
    }

    async fn token_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap> {
        self.inner.token_security(chain_id, addresses, timeout).await
    }

    async fn contract_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap> {
        self.inner.contract_security(chain_id, addresses, timeout).await
    }
}

#[tokio::test]
async fn test_panic_does_not_affect_next_message() {
    let provider = Arc::new(FlakyProvider {
        panicked: AtomicBool::new(false),
        inner: InMemoryProvider::with_default_chains(),
    });
    let app = app_with(provider, BotConfig::default());

    let first = app.clone().oneshot(message("chains")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(reply_of(first).await, HANDLER_FAILURE_REPLY);

    let second = app.oneshot(message("chains")).await.unwrap();
    assert!(reply_of(second).await.contains("• BSC (ID: 56)"));
}
