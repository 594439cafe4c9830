//! 봇 명령어 파싱.
//!
//! 형식: `/command[@botname] [argument]`
//! - `/query` - 대시보드 (고정 심볼 묶음)
//! - `/query <심볼>` - 단일 심볼 (`BTC_USD` 또는 별칭 `btcusd`)
//! - `/start` - 응답 없음

/// 봇 명령어 타입.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// 대시보드 조회
    Dashboard,
    /// 단일 심볼 조회 (사용자 입력 그대로)
    Quote(String),
    /// 시작
    Start,
    /// 알 수 없는 명령어
    Unknown(String),
}

impl BotCommand {
    /// 텍스트에서 명령어 파싱.
    ///
    /// 명령어가 아니거나 다른 봇을 지정한 명령어면 `None`.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let text = text.trim().replace('\u{a0}', " ");
        let (head, argument) = match text.split_once(' ') {
            Some((head, rest)) => (head, rest.trim()),
            None => (text.as_str(), ""),
        };

        let (name, target) = match head.rsplit_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (head, None),
        };

        if name.len() < 2 || !name.starts_with('/') {
            return None;
        }
        if let Some(target) = target {
            if !target.eq_ignore_ascii_case(bot_username) {
                return None;
            }
        }

        let command = match &name[1..] {
            "query" if argument.is_empty() => BotCommand::Dashboard,
            "query" => BotCommand::Quote(argument.to_string()),
            "start" => BotCommand::Start,
            other => BotCommand::Unknown(other.to_string()),
        };
        Some(command)
    }
}
