//! 심볼 키, 제공자별 마켓 집합, 별칭 테이블.
//!
//! 심볼 키는 `BASE_QUOTE` 형식의 대문자 문자열입니다 (예: `BTC_USD`).
//! 별칭은 밑줄을 제거한 형태입니다 (예: `BTCUSD`).

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{DataError, Result};

/// 캐시된 시세 한 건.
///
/// 값은 제공자가 보낸 문자열 그대로 저장합니다 (숫자 파싱 없음).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// 원본 시세 문자열
    pub value: String,
    /// 갱신 시각 (제공자 타임스탬프 또는 수신 시각)
    pub updated_at: DateTime<Utc>,
    /// 사용자에게 보여줄 출처 URL
    pub source_url: String,
}

impl Quote {
    pub fn new(value: impl Into<String>, updated_at: DateTime<Utc>, source_url: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            updated_at,
            source_url: source_url.into(),
        }
    }
}

/// 한 제공자가 소유한 불변 심볼 키 집합.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketSet {
    keys: BTreeSet<String>,
}

impl MarketSet {
    /// 키 목록으로 집합 생성. 키는 대문자로 정규화됩니다.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| k.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// 심볼 키의 별칭 (밑줄 제거).
pub fn alias_of(key: &str) -> String {
    key.replace('_', "")
}

/// 별칭 → 정규 키 테이블.
///
/// 시작 시 모든 제공자의 마켓 집합을 합쳐 한 번 만듭니다.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// 마켓 집합들로 별칭 테이블 생성.
    ///
    /// 서로 다른 두 정규 키가 같은 별칭으로 접히면 `ConfigError`를 반환합니다.
    /// 같은 키가 여러 집합에 있는 것은 충돌이 아닙니다.
    pub fn build<'a, I>(sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a MarketSet>,
    {
        let mut aliases: HashMap<String, String> = HashMap::new();

        for set in sets {
            for key in set.iter() {
                let alias = alias_of(key);
                match aliases.get(&alias) {
                    Some(existing) if existing != key => {
                        return Err(DataError::ConfigError(format!(
                            "alias {} maps to both {} and {}",
                            alias, existing, key
                        )));
                    }
                    Some(_) => {
                        warn!(key = %key, "여러 제공자에 중복 등록된 심볼");
                    }
                    None => {
                        aliases.insert(alias, key.to_string());
                    }
                }
            }
        }

        Ok(Self { aliases })
    }

    /// 사용자 입력을 정규 키로 변환.
    ///
    /// 대소문자를 구분하지 않습니다. 밑줄이 있으면 이미 정규 키로 보고
    /// 대문자로만 바꿉니다. 밑줄이 없고 별칭도 없으면 `None`.
    pub fn resolve(&self, input: &str) -> Option<String> {
        let key = input.trim().to_uppercase();
        if key.contains('_') {
            return Some(key);
        }
        self.aliases.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_set_normalizes_keys() {
        let set = MarketSet::from_keys(["btc_usd", " LTC_BTC "]);
        assert!(set.contains("BTC_USD"));
        assert!(set.contains("LTC_BTC"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_alias_resolution_case_insensitive() {
        let set = MarketSet::from_keys(["BTC_USD"]);
        let table = AliasTable::build([&set]).unwrap();

        assert_eq!(table.resolve("btcusd"), Some("BTC_USD".to_string()));
        assert_eq!(table.resolve("  BtcUsd "), Some("BTC_USD".to_string()));
        assert_eq!(table.resolve("ethusd"), None);
    }

    #[test]
    fn test_canonical_input_skips_alias_lookup() {
        let table = AliasTable::default();
        assert_eq!(table.resolve("eth_btc"), Some("ETH_BTC".to_string()));
    }

    #[test]
    fn test_alias_collision_is_config_error() {
        let a = MarketSet::from_keys(["AB_C"]);
        let b = MarketSet::from_keys(["A_BC"]);
        let err = AliasTable::build([&a, &b]).unwrap_err();
        assert!(matches!(err, DataError::ConfigError(_)));
    }

    #[test]
    fn test_duplicate_key_across_sets_is_not_collision() {
        let a = MarketSet::from_keys(["BTC_CNY"]);
        let b = MarketSet::from_keys(["BTC_CNY", "BTC_USD"]);
        let table = AliasTable::build([&a, &b]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("BTCCNY"), Some("BTC_CNY".to_string()));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_ignores_case(base in "[A-Z]{2,5}", quote in "[A-Z]{3}") {
                let key = format!("{}_{}", base, quote);
                let set = MarketSet::from_keys([key.as_str()]);
                let table = AliasTable::build([&set]).unwrap();

                let alias = alias_of(&key);
                prop_assert_eq!(table.resolve(&alias.to_lowercase()), Some(key.clone()));
                prop_assert_eq!(table.resolve(&key.to_lowercase()), Some(key));
            }
        }
    }
}
