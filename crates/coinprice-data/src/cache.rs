//! 심볼별 TTL 시세 캐시.
//!
//! - 신선한 항목은 I/O 없이 반환
//! - 미스 시 심볼을 소유한 제공자를 우선순위대로 찾아 배치 조회
//! - 배치 하나가 여러 항목을 한꺼번에 갱신
//! - 제공자별 in-flight 잠금으로 동시 미스를 한 번의 호출로 합침
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use coinprice_data::{default_providers, CacheConfig, PriceCache};
//!
//! let cache = PriceCache::new(default_providers(reqwest::Client::new()), CacheConfig::default());
//! let quote = cache.get("BTC_USD").await?;
//! println!("BTC_USD = {} ({})", quote.value, quote.source_url);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{DataError, Result};
use crate::market::{MarketSet, Quote};
use crate::provider::{QuoteBatch, QuoteProvider};

/// 캐시 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 모든 항목에 공통으로 적용되는 TTL
    pub ttl: Duration,
    /// `get_many` 동시 조회 수
    pub concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            concurrency: 5,
        }
    }
}

struct ProviderSlot {
    provider: Arc<dyn QuoteProvider>,
    in_flight: Mutex<()>,
}

/// 다중 제공자 시세 캐시.
pub struct PriceCache {
    providers: Vec<ProviderSlot>,
    entries: RwLock<HashMap<String, Quote>>,
    config: CacheConfig,
}

impl PriceCache {
    /// 새 캐시 생성.
    ///
    /// `providers`의 순서가 곧 라우팅 우선순위입니다. 마켓 집합이 겹치면
    /// 경고만 남기고 앞쪽 제공자가 키를 가져갑니다.
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>, config: CacheConfig) -> Self {
        for (i, first) in providers.iter().enumerate() {
            for later in &providers[i + 1..] {
                let shared = first
                    .markets()
                    .iter()
                    .filter(|key| later.markets().contains(key))
                    .count();
                if shared > 0 {
                    warn!(
                        winner = first.name(),
                        shadowed = later.name(),
                        shared = shared,
                        "제공자 마켓 집합 중복, 우선순위가 높은 쪽으로 라우팅"
                    );
                }
            }
        }

        Self {
            providers: providers
                .into_iter()
                .map(|provider| ProviderSlot {
                    provider,
                    in_flight: Mutex::new(()),
                })
                .collect(),
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// 등록된 제공자들의 마켓 집합 (우선순위 순).
    pub fn market_sets(&self) -> impl Iterator<Item = &MarketSet> {
        self.providers.iter().map(|slot| slot.provider.markets())
    }

    /// `key`를 담당할 제공자 이름.
    pub fn route(&self, key: &str) -> Option<&str> {
        self.route_slot(key).map(|slot| slot.provider.name())
    }

    fn route_slot(&self, key: &str) -> Option<&ProviderSlot> {
        self.providers
            .iter()
            .find(|slot| slot.provider.markets().contains(key))
    }

    fn is_fresh(&self, quote: &Quote, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(quote.updated_at).to_std() {
            Ok(age) => age < self.config.ttl,
            // 제공자 시계가 앞서 있는 경우
            Err(_) => true,
        }
    }

    async fn fresh(&self, key: &str) -> Option<Quote> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|quote| self.is_fresh(quote, Utc::now()))
            .cloned()
    }

    /// 신선도와 무관하게 캐시된 항목 조회 (I/O 없음).
    pub async fn peek(&self, key: &str) -> Option<Quote> {
        self.entries.read().await.get(key).cloned()
    }

    /// 캐시된 항목 수.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 시세 하나 조회.
    ///
    /// 에러는 `UnknownSymbol` 또는 `FetchFailed`뿐입니다. 조회가 실패하면
    /// 기존 항목은 하나도 바뀌지 않습니다.
    pub async fn get(&self, key: &str) -> Result<Quote> {
        if let Some(quote) = self.fresh(key).await {
            return Ok(quote);
        }

        let slot = self
            .route_slot(key)
            .ok_or_else(|| DataError::UnknownSymbol(key.to_string()))?;
        let name = slot.provider.name();

        let _guard = slot.in_flight.lock().await;

        // 잠금을 기다리는 동안 다른 작업이 갱신했을 수 있음
        if let Some(quote) = self.fresh(key).await {
            return Ok(quote);
        }

        debug!(provider = name, key = key, "캐시 미스, 배치 조회");
        let batch = slot
            .provider
            .fetch(key)
            .await
            .map_err(|e| e.into_fetch_failed(name))?;

        // 우선순위가 높은 다른 제공자가 소유한 키는 쓰지 않음
        let owned: QuoteBatch = batch
            .into_iter()
            .filter(|(k, _)| {
                self.route_slot(k)
                    .is_some_and(|owner| std::ptr::eq(owner, slot))
            })
            .collect();

        let requested = owned
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, quote)| quote.clone());

        {
            let mut entries = self.entries.write().await;
            for (k, quote) in owned {
                entries.insert(k, quote);
            }
        }

        requested.ok_or_else(|| {
            DataError::fetch_failed(name, format!("response did not include {}", key))
        })
    }

    /// 여러 시세를 동시에 조회.
    ///
    /// 결과는 입력 순서를 유지하며, 키마다 독립적으로 성공/실패합니다.
    pub async fn get_many<S: AsRef<str>>(&self, keys: &[S]) -> Vec<(String, Result<Quote>)> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        stream::iter(keys)
            .map(|key| async move {
                let result = self.get(&key).await;
                (key, result)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }
}
