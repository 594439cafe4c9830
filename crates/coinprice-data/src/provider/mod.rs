//! 시세 제공자.
//!
//! 각 제공자는 자신이 소유한 마켓 집합을 선언하고, 한 번의 호출로
//! 여러 키를 채우는 배치 조회를 구현합니다.
//!
//! 라우팅 우선순위 (먼저 소유한 쪽이 이깁니다):
//! 1. `yahoo` - 단일 페어 환율
//! 2. `btcchina` - 고정 페어 티커
//! 3. `coinbase` - BTC 기준 법정화폐 환율
//! 4. `poloniex` - 거래소 전체 티커

pub mod btcchina;
pub mod coinbase;
pub mod poloniex;
pub mod yahoo;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{DataError, Result};
use crate::market::{MarketSet, Quote};

pub use btcchina::BtcChinaProvider;
pub use coinbase::CoinbaseProvider;
pub use poloniex::PoloniexProvider;
pub use yahoo::YahooProvider;

/// 제공자 HTTP 호출 기본 타임아웃.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// 한 번의 배치 조회 결과 (정규 키, 시세).
pub type QuoteBatch = Vec<(String, Quote)>;

/// 시세 제공자 trait.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 로그와 에러에 쓰는 제공자 이름.
    fn name(&self) -> &str;

    /// 이 제공자가 소유한 마켓 집합.
    fn markets(&self) -> &MarketSet;

    /// `key`를 포함하는 배치 조회.
    ///
    /// 배치 제공자는 `key`와 무관하게 전체 스냅샷을 반환하고,
    /// 단일 페어 제공자는 `key` 하나만 조회합니다.
    async fn fetch(&self, key: &str) -> Result<QuoteBatch>;
}

/// 기본 제공자 목록을 라우팅 우선순위 순서로 생성.
pub fn default_providers(client: Client) -> Vec<Arc<dyn QuoteProvider>> {
    vec![
        Arc::new(YahooProvider::new(client.clone())),
        Arc::new(BtcChinaProvider::new(client.clone())),
        Arc::new(CoinbaseProvider::new(client.clone())),
        Arc::new(PoloniexProvider::new(client)),
    ]
}

/// GET 요청 후 2xx가 아니면 `FetchFailed`.
pub(crate) async fn get_checked(
    client: &Client,
    provider: &str,
    url: &str,
    timeout: Duration,
) -> Result<String> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        Ok(body)
    } else {
        error!(provider = provider, "시세 조회 실패: {} - {}", status, body);
        Err(DataError::fetch_failed(
            provider,
            format!("HTTP {}: {}", status, body),
        ))
    }
}

/// GET 요청 후 JSON 본문 파싱.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    provider: &str,
    url: &str,
    timeout: Duration,
) -> Result<T> {
    let body = get_checked(client, provider, url, timeout).await?;
    serde_json::from_str(&body).map_err(|e| {
        error!(provider = provider, "응답 파싱 실패: {} - Body: {}", e, body);
        DataError::fetch_failed(provider, format!("malformed payload: {}", e))
    })
}

/// JSON 값을 원본 시세 문자열로 변환.
///
/// 문자열은 그대로, 숫자는 JSON 표기 그대로 사용합니다.
pub(crate) fn quote_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_text() {
        assert_eq!(quote_text(&json!("0.0123")), Some("0.0123".to_string()));
        assert_eq!(quote_text(&json!(9000)), Some("9000".to_string()));
        assert_eq!(quote_text(&json!(null)), None);
        assert_eq!(quote_text(&json!({"last": "1"})), None);
    }

    #[test]
    fn test_default_providers_priority_order() {
        let providers = default_providers(Client::new());
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["yahoo", "btcchina", "coinbase", "poloniex"]);
    }
}
