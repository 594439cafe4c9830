//! Poloniex 거래소 티커 제공자.
//!
//! `returnTicker` 한 번으로 전체 페어 스냅샷을 받습니다.
//! Poloniex 표기(`QUOTE_BASE`, 예: `BTC_LTC`)를 정규 키(`LTC_BTC`)로 뒤집습니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use super::{get_json, quote_text, QuoteBatch, QuoteProvider, DEFAULT_PROVIDER_TIMEOUT};
use crate::error::{DataError, Result};
use crate::market::{MarketSet, Quote};

const NAME: &str = "poloniex";
const DEFAULT_BASE_URL: &str = "https://poloniex.com";
const EXCHANGE_URL: &str = "https://poloniex.com/exchange#";

/// 기본 마켓 집합 (정규 키).
pub const MARKETS: &[&str] = &[
    "AMP_BTC", "ARDR_BTC", "BBR_BTC", "BCN_BTC", "BCY_BTC", "BELA_BTC",
    "BITS_BTC", "BLK_BTC", "BTCD_BTC", "BTM_BTC", "BTS_BTC", "BURST_BTC",
    "BTC_C2", "CLAM_BTC", "CURE_BTC", "DASH_BTC", "DCR_BTC", "DGB_BTC",
    "DOGE_BTC", "BTC_EMC2", "ETC_BTC", "ETH_BTC", "EXP_BTC", "FCT_BTC",
    "FLDC_BTC", "FLO_BTC", "GAME_BTC", "GNT_BTC", "GRC_BTC", "HUC_BTC",
    "HZ_BTC", "IOC_BTC", "LBC_BTC", "LSK_BTC", "LTC_BTC", "MAID_BTC",
    "MYR_BTC", "NAUT_BTC", "NAV_BTC", "NEOS_BTC", "NMC_BTC", "NOBL_BTC",
    "NOTE_BTC", "NSR_BTC", "NXC_BTC", "NXT_BTC", "OMNI_BTC", "PASC_BTC",
    "PINK_BTC", "POT_BTC", "PPC_BTC", "QBK_BTC", "QORA_BTC", "QTL_BTC",
    "RADS_BTC", "RBY_BTC", "REP_BTC", "RIC_BTC", "SBD_BTC", "SC_BTC",
    "SDC_BTC", "SJCX_BTC", "STEEM_BTC", "STR_BTC", "STRAT_BTC", "SYS_BTC",
    "UNITY_BTC", "VIA_BTC", "VOX_BTC", "VRC_BTC", "VTC_BTC", "XBC_BTC",
    "XCP_BTC", "XEM_BTC", "XMG_BTC", "XMR_BTC", "XPM_BTC", "XRP_BTC",
    "XVC_BTC", "ZEC_BTC", "ETC_ETH", "GNT_ETH", "LSK_ETH", "REP_ETH",
    "STEEM_ETH", "ZEC_ETH", "BTC_USDT", "DASH_USDT", "ETC_USDT", "ETH_USDT",
    "LTC_USDT", "NXT_USDT", "REP_USDT", "STR_USDT", "XMR_USDT", "XRP_USDT",
    "ZEC_USDT", "BBR_XMR", "BCN_XMR", "BLK_XMR", "BTCD_XMR", "DASH_XMR",
    "LTC_XMR", "MAID_XMR", "NXT_XMR", "QORA_XMR", "ZEC_XMR",
];

/// Poloniex 전체 티커 제공자.
pub struct PoloniexProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
    markets: MarketSet,
}

impl PoloniexProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            markets: MarketSet::from_keys(MARKETS),
        }
    }

    /// API 기본 URL 변경 (테스트용 목 서버 등).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 마켓 집합 교체.
    pub fn with_markets(mut self, markets: MarketSet) -> Self {
        self.markets = markets;
        self
    }

    /// Poloniex 페어 표기를 정규 키로 변환 (`BTC_LTC` -> `LTC_BTC`).
    fn canonical_key(native: &str) -> String {
        native
            .split('_')
            .rev()
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase()
    }
}

#[async_trait]
impl QuoteProvider for PoloniexProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn markets(&self) -> &MarketSet {
        &self.markets
    }

    async fn fetch(&self, _key: &str) -> Result<QuoteBatch> {
        let url = format!("{}/public?command=returnTicker", self.base_url);
        let tickers: HashMap<String, serde_json::Value> =
            get_json(&self.client, NAME, &url, self.timeout).await?;
        let fetched_at = Utc::now();

        let mut batch = QuoteBatch::new();
        for (native, ticker) in &tickers {
            let key = Self::canonical_key(native);
            if !self.markets.contains(&key) {
                continue;
            }

            let last = ticker
                .get("last")
                .and_then(quote_text)
                .ok_or_else(|| {
                    DataError::fetch_failed(NAME, format!("ticker {} has no usable last price", native))
                })?;

            let source = format!("{}{}", EXCHANGE_URL, native.to_lowercase());
            batch.push((key, Quote::new(last, fetched_at, source)));
        }

        debug!(provider = NAME, count = batch.len(), "티커 스냅샷 수신");
        Ok(batch)
    }
}
