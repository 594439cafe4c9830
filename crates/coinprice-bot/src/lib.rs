//! 시세 조회 봇.
//!
//! 이 crate는 다음을 제공합니다:
//! - 메시징 API 클라이언트 (`getUpdates` long polling, `sendMessage`)
//! - 업데이트 폴러와 핸들러 trait
//! - `/query` 명령어 파싱, 응답 포맷, 시세 핸들러
//! - INI + 환경 변수 설정

pub mod api;
pub mod command;
pub mod config;
pub mod format;
pub mod handler;
pub mod poller;
pub mod types;

pub use api::{BotApi, MessageTransport, DEFAULT_API_URL};
pub use command::BotCommand;
pub use config::AppConfig;
pub use handler::{PriceBot, Reply};
pub use poller::{PollOutcome, PollerConfig, UpdateHandler, UpdatePoller};
pub use types::{BotError, BotResult, OutgoingMessage, ParseMode, Update};
