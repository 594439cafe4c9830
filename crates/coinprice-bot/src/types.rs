//! 메시징 API 타입 및 에러 정의.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 개별 업데이트.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// 메시지 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    #[serde(default)]
    pub date: i64,
}

/// 사용자 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

/// 채팅 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// 메시지 파싱 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

/// 전송할 메시지.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_web_page_preview: bool,
}

impl OutgoingMessage {
    /// 일반 텍스트 메시지.
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            disable_web_page_preview: false,
        }
    }

    /// Markdown 메시지 (링크 미리보기 끔).
    pub fn markdown(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: Some(ParseMode::Markdown),
            disable_web_page_preview: true,
        }
    }
}

/// API 응답 봉투.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i32>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// 봇 작업용 Result 타입.
pub type BotResult<T> = Result<T, BotError>;

/// 봇 에러.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("네트워크 에러: {0}")]
    Network(#[from] reqwest::Error),

    #[error("잘못된 응답: {0}")]
    Malformed(String),

    #[error("API 에러 {code}: {description}")]
    Api {
        code: i32,
        description: String,
        retry_after: Option<Duration>,
    },

    #[error("잘못된 설정: {0}")]
    Config(String),
}

impl BotError {
    /// 서버가 지정한 재시도 대기 시간.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BotError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// 전송 계층 에러인지 (재시도 대상).
    pub fn is_retryable(&self) -> bool {
        matches!(self, BotError::Network(_) | BotError::Malformed(_))
    }
}

impl From<ApiEnvelope> for BotError {
    fn from(envelope: ApiEnvelope) -> Self {
        BotError::Api {
            code: envelope.error_code.unwrap_or_default(),
            description: envelope.description.unwrap_or_default(),
            retry_after: envelope
                .parameters
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_with_message() {
        let json = r#"{
            "update_id": 42,
            "message": {
                "message_id": 7,
                "from": {"id": 1, "username": "alice"},
                "chat": {"id": -100},
                "date": 1500000000,
                "text": "/query"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 42);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100);
        assert_eq!(message.text.as_deref(), Some("/query"));
    }

    #[test]
    fn test_parse_update_without_message() {
        let update: Update =
            serde_json::from_str(r#"{"update_id": 3, "edited_message": {}}"#).unwrap();
        assert!(update.message.is_none());
    }

    #[test]
    fn test_outgoing_message_serialization() {
        let plain = serde_json::to_value(OutgoingMessage::plain(1, "hi")).unwrap();
        assert_eq!(plain, serde_json::json!({"chat_id": 1, "text": "hi"}));

        let md = serde_json::to_value(OutgoingMessage::markdown(1, "*hi*")).unwrap();
        assert_eq!(md["parse_mode"], "Markdown");
        assert_eq!(md["disable_web_page_preview"], true);
    }

    #[test]
    fn test_error_envelope_retry_after() {
        let envelope: ApiEnvelope = serde_json::from_str(
            r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 3", "parameters": {"retry_after": 3}}"#,
        )
        .unwrap();
        let err = BotError::from(envelope);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert!(!err.is_retryable());
    }
}
