//! Coinbase 환율 제공자.
//!
//! 기준 통화(BTC)와 통화별 환율 맵을 한 번에 받아 `BTC_<통화>` 키를 채웁니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{get_json, quote_text, QuoteBatch, QuoteProvider, DEFAULT_PROVIDER_TIMEOUT};
use crate::error::{DataError, Result};
use crate::market::{MarketSet, Quote};

const NAME: &str = "coinbase";
const DEFAULT_BASE_URL: &str = "https://api.coinbase.com";
const SOURCE_URL: &str = "https://www.coinbase.com/charts";
const BASE_CURRENCY: &str = "BTC";

/// BTC 대비 환율을 제공하는 통화 목록. CNY는 btcchina가 담당합니다.
pub const CURRENCIES: &[&str] = &[
    "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN",
    "BAM", "BBD", "BDT", "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BRL",
    "BSD", "BTC", "BTN", "BWP", "BYN", "BYR", "BZD", "CAD", "CDF", "CHF",
    "CLF", "CLP", "COP", "CRC", "CUC", "CVE", "CZK", "DJF", "DKK",
    "DOP", "DZD", "EEK", "EGP", "ERN", "ETB", "ETH", "EUR", "FJD", "FKP",
    "GBP", "GEL", "GGP", "GHS", "GIP", "GMD", "GNF", "GTQ", "GYD", "HKD",
    "HNL", "HRK", "HTG", "HUF", "IDR", "ILS", "IMP", "INR", "IQD", "ISK",
    "JEP", "JMD", "JOD", "JPY", "KES", "KGS", "KHR", "KMF", "KRW", "KWD",
    "KYD", "KZT", "LAK", "LBP", "LKR", "LRD", "LSL", "LTL", "LVL", "LYD",
    "MAD", "MDL", "MGA", "MKD", "MMK", "MNT", "MOP", "MRO", "MTL", "MUR",
    "MVR", "MWK", "MXN", "MYR", "MZN", "NAD", "NGN", "NIO", "NOK", "NPR",
    "NZD", "OMR", "PAB", "PEN", "PGK", "PHP", "PKR", "PLN", "PYG", "QAR",
    "RON", "RSD", "RUB", "RWF", "SAR", "SBD", "SCR", "SEK", "SGD", "SHP",
    "SLL", "SOS", "SRD", "SSP", "STD", "SVC", "SZL", "THB", "TJS", "TMT",
    "TND", "TOP", "TRY", "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "UYU",
    "UZS", "VEF", "VND", "VUV", "WST", "XAF", "XAG", "XAU", "XCD", "XDR",
    "XOF", "XPD", "XPF", "XPT", "YER", "ZAR", "ZMK", "ZMW", "ZWL",
];

#[derive(Debug, Deserialize)]
struct ExchangeRatesResponse {
    data: ExchangeRates,
}

#[derive(Debug, Deserialize)]
struct ExchangeRates {
    currency: String,
    rates: HashMap<String, serde_json::Value>,
}

/// Coinbase 환율 제공자.
pub struct CoinbaseProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
    markets: MarketSet,
}

impl CoinbaseProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            markets: MarketSet::from_keys(
                CURRENCIES.iter().map(|c| format!("{}_{}", BASE_CURRENCY, c)),
            ),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_markets(mut self, markets: MarketSet) -> Self {
        self.markets = markets;
        self
    }
}

#[async_trait]
impl QuoteProvider for CoinbaseProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn markets(&self) -> &MarketSet {
        &self.markets
    }

    async fn fetch(&self, _key: &str) -> Result<QuoteBatch> {
        let url = format!(
            "{}/v2/exchange-rates?currency={}",
            self.base_url, BASE_CURRENCY
        );
        let response: ExchangeRatesResponse =
            get_json(&self.client, NAME, &url, self.timeout).await?;
        let fetched_at = Utc::now();
        let base = response.data.currency.to_uppercase();

        let mut batch = QuoteBatch::new();
        for (currency, rate) in &response.data.rates {
            let key = format!("{}_{}", base, currency.to_uppercase());
            if !self.markets.contains(&key) {
                continue;
            }

            let value = quote_text(rate).ok_or_else(|| {
                DataError::fetch_failed(NAME, format!("rate for {} is not a number", currency))
            })?;
            batch.push((key, Quote::new(value, fetched_at, SOURCE_URL)));
        }

        debug!(provider = NAME, count = batch.len(), "환율 맵 수신");
        Ok(batch)
    }
}
