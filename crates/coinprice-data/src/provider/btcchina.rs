//! BTCChina 고정 페어 티커 제공자.
//!
//! 한 번의 호출로 `BTC_CNY`, `LTC_CNY` 두 페어를 받습니다.
//! 갱신 시각은 제공자가 보낸 `date` 필드를 사용합니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use tracing::debug;

use super::{get_json, quote_text, QuoteBatch, QuoteProvider, DEFAULT_PROVIDER_TIMEOUT};
use crate::error::{DataError, Result};
use crate::market::{MarketSet, Quote};

const NAME: &str = "btcchina";
const DEFAULT_BASE_URL: &str = "https://data.btcchina.com";
const SOURCE_URL: &str = "https://spot.btcc.com/";

/// 응답 필드 이름 → 정규 키.
const TICKERS: &[(&str, &str)] = &[("ticker_btccny", "BTC_CNY"), ("ticker_ltccny", "LTC_CNY")];

/// BTCChina 티커 제공자.
pub struct BtcChinaProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
    markets: MarketSet,
}

impl BtcChinaProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            markets: MarketSet::from_keys(TICKERS.iter().map(|(_, key)| *key)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 티커의 `date` 필드 (유닉스 초). 없거나 잘못되면 `None`.
    fn ticker_time(ticker: &serde_json::Value) -> Option<DateTime<Utc>> {
        let date = ticker.get("date")?;
        let secs = match date {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Utc.timestamp_opt(secs, 0).single()
    }
}

#[async_trait]
impl QuoteProvider for BtcChinaProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn markets(&self) -> &MarketSet {
        &self.markets
    }

    async fn fetch(&self, _key: &str) -> Result<QuoteBatch> {
        let url = format!("{}/data/ticker?market=all", self.base_url);
        let response: HashMap<String, serde_json::Value> =
            get_json(&self.client, NAME, &url, self.timeout).await?;
        let received_at = Utc::now();

        let mut batch = QuoteBatch::new();
        for (field, key) in TICKERS {
            let ticker = response
                .get(*field)
                .ok_or_else(|| DataError::fetch_failed(NAME, format!("missing {}", field)))?;
            let last = ticker
                .get("last")
                .and_then(quote_text)
                .ok_or_else(|| DataError::fetch_failed(NAME, format!("{} has no last price", field)))?;
            let updated_at = Self::ticker_time(ticker).unwrap_or(received_at);

            batch.push((key.to_string(), Quote::new(last, updated_at, SOURCE_URL)));
        }

        debug!(provider = NAME, count = batch.len(), "티커 수신");
        Ok(batch)
    }
}
