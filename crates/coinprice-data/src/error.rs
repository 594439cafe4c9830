//! 시세 데이터 모듈 오류 타입.

use thiserror::Error;

/// 시세 조회 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 어떤 제공자도 소유하지 않는 심볼
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// 네트워크/타임아웃 오류 (제공자 HTTP 호출)
    #[error("Transport error: {0}")]
    Transport(String),

    /// 제공자 응답을 사용할 수 없음 (비정상 상태 코드, 잘못된 페이로드, 누락된 키)
    #[error("Fetch failed ({provider}): {message}")]
    FetchFailed { provider: String, message: String },

    /// 설정 오류 (별칭 충돌 등)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DataError {
    /// 제공자 이름이 붙은 `FetchFailed` 생성.
    pub fn fetch_failed(provider: &str, message: impl Into<String>) -> Self {
        DataError::FetchFailed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// 알 수 없는 심볼 오류인지 확인.
    pub fn is_unknown_symbol(&self) -> bool {
        matches!(self, DataError::UnknownSymbol(_))
    }

    /// 캐시 경계에서 사용하는 형태로 변환.
    ///
    /// `UnknownSymbol`과 `FetchFailed`는 그대로 두고 나머지는 `FetchFailed`로 감쌉니다.
    pub(crate) fn into_fetch_failed(self, provider: &str) -> Self {
        match self {
            DataError::UnknownSymbol(_) | DataError::FetchFailed { .. } => self,
            other => DataError::fetch_failed(provider, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Transport(format!("timeout: {}", err))
        } else {
            DataError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_fetch_failed_wraps_transport() {
        let err = DataError::Transport("connection reset".to_string()).into_fetch_failed("poloniex");
        match err {
            DataError::FetchFailed { provider, message } => {
                assert_eq!(provider, "poloniex");
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_into_fetch_failed_keeps_unknown_symbol() {
        let err = DataError::UnknownSymbol("FOO_BAR".to_string()).into_fetch_failed("yahoo");
        assert!(err.is_unknown_symbol());
    }
}
