//! 응답 메시지 포맷.
//!
//! 캐시 값은 문자열 그대로 출력하고, 파생 교차 시세(예: `ETHUSD = ETH_BTC * BTC_USD`)만
//! 여기서 실수로 계산합니다.

use std::collections::HashMap;

use coinprice_data::{alias_of, DataError, Quote};

/// 대시보드에 표시하는 심볼.
pub const DASHBOARD_KEYS: &[&str] = &[
    "BTC_USD", "BTC_CNY", "LTC_BTC", "LTC_CNY", "USD_CNY", "JPY_CNY", "ETH_BTC", "ZEC_BTC",
    "XMR_BTC",
];

/// 대시보드 각 줄 구성: 표시할 심볼들과, 있으면 USD 환산할 BTC 페어.
const DASHBOARD_LINES: &[(&[&str], Option<&str>)] = &[
    (&["BTC_USD", "BTC_CNY"], None),
    (&["LTC_BTC", "LTC_CNY"], None),
    (&["USD_CNY", "JPY_CNY"], None),
    (&["ETH_BTC"], Some("ETH")),
    (&["ZEC_BTC"], Some("ZEC")),
    (&["XMR_BTC"], Some("XMR")),
];

/// 사용자용 실패 메시지.
pub const FAILURE_TEXT: &str = "Failed to fetch data. Please try again later.";

/// 데이터 소스가 없는 심볼 안내.
pub fn no_source_text(input: &str) -> String {
    format!("We don't have data source for {}.", input.trim())
}

/// 포맷 에러.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{key} unavailable: {source}")]
    Unavailable {
        key: String,
        #[source]
        source: DataError,
    },

    #[error("{key} missing from results")]
    Missing { key: String },

    #[error("{key} is not a number: {value:?}")]
    NotANumber { key: String, value: String },
}

/// `[라벨](출처)=값` 형식의 한 항목.
pub fn quote_link(key: &str, quote: &Quote) -> String {
    format!("[{}]({})={}", alias_of(key), quote.source_url, quote.value)
}

fn lookup<'a>(quotes: &'a HashMap<String, Quote>, key: &str) -> Result<&'a Quote, FormatError> {
    quotes.get(key).ok_or_else(|| FormatError::Missing {
        key: key.to_string(),
    })
}

fn parse_value(key: &str, quote: &Quote) -> Result<f64, FormatError> {
    quote
        .value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FormatError::NotANumber {
            key: key.to_string(),
            value: quote.value.clone(),
        })
}

/// 대시보드 메시지 생성.
///
/// 하나라도 조회에 실패하면 전체가 실패합니다.
pub fn dashboard(results: Vec<(String, coinprice_data::Result<Quote>)>) -> Result<String, FormatError> {
    let mut quotes: HashMap<String, Quote> = HashMap::new();
    for (key, result) in results {
        match result {
            Ok(quote) => {
                quotes.insert(key, quote);
            }
            Err(source) => return Err(FormatError::Unavailable { key, source }),
        }
    }

    let mut lines = Vec::with_capacity(DASHBOARD_LINES.len());
    for (keys, usd_base) in DASHBOARD_LINES {
        let mut parts = Vec::with_capacity(keys.len() + 1);
        for key in keys.iter() {
            parts.push(quote_link(key, lookup(&quotes, key)?));
        }

        if let Some(base) = usd_base {
            let pair = format!("{}_BTC", base);
            let cross = parse_value(&pair, lookup(&quotes, &pair)?)?
                * parse_value("BTC_USD", lookup(&quotes, "BTC_USD")?)?;
            parts.push(format!("{}USD={:.4}", base, cross));
        }

        lines.push(parts.join(" "));
    }

    Ok(lines.join("\n"))
}

/// Markdown 링크를 라벨만 남기고 제거 (로그용).
pub fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        let Some(label_end) = rest[start..].find("](").map(|i| start + i) else {
            break;
        };
        let Some(url_end) = rest[label_end..].find(')').map(|i| label_end + i) else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&rest[start + 1..label_end]);
        rest = &rest[url_end + 1..];
    }

    out.push_str(rest);
    out.replace('\n', " ")
}
