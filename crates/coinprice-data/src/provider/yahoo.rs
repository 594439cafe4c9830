//! Yahoo Finance 단일 페어 환율 제공자.
//!
//! 페어마다 한 번씩 호출하며, 응답은 가격 한 줄짜리 CSV 텍스트입니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use super::{get_checked, QuoteBatch, QuoteProvider, DEFAULT_PROVIDER_TIMEOUT};
use crate::error::{DataError, Result};
use crate::market::{MarketSet, Quote};

const NAME: &str = "yahoo";
const DEFAULT_BASE_URL: &str = "http://download.finance.yahoo.com";

/// 정규 키 → Yahoo 통화 심볼.
pub const PAIRS: &[(&str, &str)] = &[("USD_CNY", "USDCNY"), ("JPY_CNY", "JPYCNY")];

/// Yahoo 환율 제공자.
pub struct YahooProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
    pairs: Vec<(String, String)>,
    markets: MarketSet,
}

impl YahooProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            pairs: PAIRS
                .iter()
                .map(|(key, symbol)| (key.to_string(), symbol.to_string()))
                .collect(),
            markets: MarketSet::from_keys(PAIRS.iter().map(|(key, _)| *key)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn symbol_for(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, symbol)| symbol.as_str())
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn markets(&self) -> &MarketSet {
        &self.markets
    }

    async fn fetch(&self, key: &str) -> Result<QuoteBatch> {
        let symbol = self
            .symbol_for(key)
            .ok_or_else(|| DataError::UnknownSymbol(key.to_string()))?;

        let url = format!(
            "{}/d/quotes.csv?e=.csv&f=l1&s={}=X",
            self.base_url, symbol
        );
        let body = get_checked(&self.client, NAME, &url, self.timeout).await?;
        let value = body.trim();
        if value.is_empty() {
            return Err(DataError::fetch_failed(NAME, format!("empty quote for {}", symbol)));
        }

        debug!(provider = NAME, key = key, value = value, "환율 수신");
        let source = format!("http://finance.yahoo.com/quote/{}=X", symbol);
        Ok(vec![(key.to_string(), Quote::new(value, Utc::now(), source))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_for() {
        let provider = YahooProvider::new(Client::new());
        assert_eq!(provider.symbol_for("USD_CNY"), Some("USDCNY"));
        assert_eq!(provider.symbol_for("JPY_CNY"), Some("JPYCNY"));
        assert_eq!(provider.symbol_for("EUR_CNY"), None);
    }

    #[tokio::test]
    async fn test_fetch_unknown_pair() {
        let provider = YahooProvider::new(Client::new());
        let err = provider.fetch("EUR_CNY").await.unwrap_err();
        assert!(err.is_unknown_symbol());
    }
}
