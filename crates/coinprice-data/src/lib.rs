//! 시세 데이터 수집 및 캐싱.
//!
//! 이 crate는 다음을 제공합니다:
//! - 심볼 키와 제공자별 마켓 집합, 별칭 테이블
//! - 외부 시세 제공자 (Poloniex, Coinbase, BTCChina, Yahoo)
//! - 제공자 라우팅과 배치 갱신을 하는 TTL 캐시

pub mod cache;
pub mod error;
pub mod market;
pub mod provider;

pub use cache::{CacheConfig, PriceCache};
pub use error::{DataError, Result};
pub use market::{alias_of, AliasTable, MarketSet, Quote};
pub use provider::{default_providers, QuoteBatch, QuoteProvider};
