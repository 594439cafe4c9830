//! 설정 관리.
//!
//! 기본값 → INI 파일(`config.ini`) → 환경 변수(`COINPRICE__BOT__APITOKEN` 등) 순으로 덮어씁니다.
//!
//! ```ini
//! [Bot]
//! apitoken = 123456:ABC-DEF
//! username = coinprice_bot
//!
//! [Cache]
//! ttl = 60
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use coinprice_data::CacheConfig;
use serde::Deserialize;

use crate::api::DEFAULT_API_URL;
use crate::poller::PollerConfig;
use crate::types::{BotError, BotResult};

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config.ini";

const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 봇 설정
    #[serde(default, alias = "Bot")]
    pub bot: BotSection,
    /// 캐시 설정
    #[serde(default, alias = "Cache")]
    pub cache: CacheSection,
    /// 폴링 설정
    #[serde(default, alias = "Poller")]
    pub poller: PollerSection,
}

/// 봇 설정.
///
/// `Debug` 구현은 토큰을 마스킹합니다.
#[derive(Clone, Deserialize)]
pub struct BotSection {
    /// API 토큰
    #[serde(default)]
    pub apitoken: String,
    /// 봇 계정 이름 (없으면 시작 시 조회)
    #[serde(default)]
    pub username: Option<String>,
    /// API 주소
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl fmt::Debug for BotSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = match self.apitoken.split_once(':') {
            Some((bot_id, _)) => format!("{}:***REDACTED***", bot_id),
            None => "***REDACTED***".to_string(),
        };

        f.debug_struct("BotSection")
            .field("apitoken", &masked)
            .field("username", &self.username)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            apitoken: String::new(),
            username: None,
            api_url: default_api_url(),
        }
    }
}

impl BotSection {
    /// 설정된 봇 계정 이름 (앞의 `@`와 빈 값 제거).
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(|u| u.trim().trim_start_matches('@'))
            .filter(|u| !u.is_empty())
    }
}

/// 캐시 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// TTL (초)
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    /// 다중 조회 동시 실행 수
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            concurrency: default_concurrency(),
        }
    }
}

/// 폴링 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerSection {
    /// long poll 대기 시간 (초)
    #[serde(default = "default_long_poll")]
    pub timeout: u64,
    /// 사이클 간 대기 (밀리초)
    #[serde(default = "default_idle_pause")]
    pub pause_ms: u64,
    /// 전송 실패 후 대기 (밀리초)
    #[serde(default = "default_error_delay")]
    pub error_delay_ms: u64,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            timeout: default_long_poll(),
            pause_ms: default_idle_pause(),
            error_delay_ms: default_error_delay(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    #[serde(default)]
    bot: BotOverrides,
    #[serde(default)]
    cache: CacheOverrides,
    #[serde(default)]
    poller: PollerOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct BotOverrides {
    apitoken: Option<String>,
    username: Option<String>,
    api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CacheOverrides {
    ttl: Option<u64>,
    concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PollerOverrides {
    timeout: Option<u64>,
    pause_ms: Option<u64>,
    error_delay_ms: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ttl() -> u64 {
    60
}

fn default_concurrency() -> usize {
    5
}

fn default_long_poll() -> u64 {
    30
}

fn default_idle_pause() -> u64 {
    200
}

fn default_error_delay() -> u64 {
    1000
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다. 파일이 없어도 됩니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let mut app = Self::from_source(
            config::File::from(path.as_ref())
                .format(config::FileFormat::Ini)
                .required(false),
        )?;
        app.apply_env()?;
        Ok(app)
    }

    /// INI 문자열에서 설정을 로드합니다 (환경 변수 미적용).
    pub fn from_ini(contents: &str) -> Result<Self, config::ConfigError> {
        Self::from_source(config::File::from_str(contents, config::FileFormat::Ini))
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// `COINPRICE__<SECTION>__<KEY>` 환경 변수 적용.
    ///
    /// 파일의 섹션 이름 대소문자와 무관하게 덮어쓰도록 별도 레이어로 읽습니다.
    fn apply_env(&mut self) -> Result<(), config::ConfigError> {
        let env: EnvOverrides = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("COINPRICE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        let EnvOverrides { bot, cache, poller } = env;
        if let Some(token) = bot.apitoken {
            self.bot.apitoken = token;
        }
        if bot.username.is_some() {
            self.bot.username = bot.username;
        }
        if let Some(url) = bot.api_url {
            self.bot.api_url = url;
        }
        if let Some(ttl) = cache.ttl {
            self.cache.ttl = ttl;
        }
        if let Some(concurrency) = cache.concurrency {
            self.cache.concurrency = concurrency;
        }
        if let Some(timeout) = poller.timeout {
            self.poller.timeout = timeout;
        }
        if let Some(pause_ms) = poller.pause_ms {
            self.poller.pause_ms = pause_ms;
        }
        if let Some(error_delay_ms) = poller.error_delay_ms {
            self.poller.error_delay_ms = error_delay_ms;
        }
        Ok(())
    }

    /// 필수 값 확인.
    pub fn validate(&self) -> BotResult<()> {
        if self.bot.apitoken.trim().is_empty() {
            return Err(BotError::Config(
                "API 토큰이 설정되지 않았습니다 ([Bot] apitoken 또는 COINPRICE__BOT__APITOKEN)"
                    .to_string(),
            ));
        }
        if self.cache.concurrency == 0 {
            return Err(BotError::Config("cache.concurrency는 1 이상이어야 합니다".to_string()));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache.ttl),
            concurrency: self.cache.concurrency,
        }
    }

    /// 전송 요청 타임아웃. long poll 대기 시간보다 항상 15초 깁니다.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poller.timeout) + REQUEST_TIMEOUT_MARGIN
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            long_poll_timeout: Duration::from_secs(self.poller.timeout),
            idle_pause: Duration::from_millis(self.poller.pause_ms),
            error_delay: Duration::from_millis(self.poller.error_delay_ms),
        }
    }
}
