//! 메시징 API 클라이언트.
//!
//! 모든 호출은 `invoke(method, params)` 하나를 거칩니다. 전송 계층 실패
//! (네트워크, 잘못된 응답 본문)는 최대 3회까지 `attempt * 2`초 간격으로
//! 재시도하고, API 에러 봉투는 재시도하지 않습니다.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::types::{ApiEnvelope, BotError, BotResult, OutgoingMessage, Update, User};

/// 기본 API 주소.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// 요청 타임아웃 (long poll 대기 시간보다 길어야 함).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// 폴러와 핸들러가 의존하는 메시징 전송 trait.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// `offset` 이후 업데이트를 최대 `timeout` 동안 기다려 가져옵니다.
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> BotResult<Vec<Update>>;

    /// 메시지를 전송합니다.
    async fn send_message(&self, message: &OutgoingMessage) -> BotResult<()>;
}

/// 봇 API 클라이언트.
pub struct BotApi {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
    max_attempts: u32,
    retry_unit: Duration,
}

impl BotApi {
    /// 새 클라이언트 생성.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_unit: Duration::from_secs(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 재시도 정책 변경. `n`번째 실패 후 `retry_unit * n * 2`만큼 대기합니다.
    pub fn with_retry(mut self, max_attempts: u32, retry_unit: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_unit = retry_unit;
        self
    }

    /// API 메서드 호출.
    pub async fn invoke(&self, method: &str, params: Value) -> BotResult<Value> {
        // 토큰이 들어 있으므로 URL은 로그에 남기지 않음
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);

        let envelope = retry_transport(method, self.max_attempts, self.retry_unit, || {
            self.request(&url, &params)
        })
        .await?;

        if !envelope.ok {
            let err = BotError::from(envelope);
            debug!(method = method, "API 에러 응답: {}", err);
            return Err(err);
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// 응답 결과를 타입으로 변환하는 호출.
    pub async fn invoke_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> BotResult<T> {
        let result = self.invoke(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| BotError::Malformed(format!("{} result: {}", method, e)))
    }

    async fn request(&self, url: &str, params: &Value) -> BotResult<ApiEnvelope> {
        let response = self
            .client
            .post(url)
            .json(params)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            BotError::Malformed(format!("HTTP {}: {} - {}", status, e, preview))
        })
    }

    /// 봇 자신의 계정 정보.
    pub async fn get_me(&self) -> BotResult<User> {
        self.invoke_as("getMe", json!({})).await
    }
}

/// 전송 계층 에러만 재시도. `n`번째 실패 후 `retry_unit * n * 2`만큼 대기합니다.
async fn retry_transport<T, F, Fut>(
    method: &str,
    max_attempts: u32,
    retry_unit: Duration,
    mut call: F,
) -> BotResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BotResult<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = retry_unit * (attempt * 2);
                warn!(
                    method = method,
                    attempt = attempt,
                    "API 호출 실패, {:?} 후 재시도: {}",
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl MessageTransport for BotApi {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> BotResult<Vec<Update>> {
        let mut params = json!({ "timeout": timeout.as_secs() });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }
        self.invoke_as("getUpdates", params).await
    }

    async fn send_message(&self, message: &OutgoingMessage) -> BotResult<()> {
        let params = serde_json::to_value(message)
            .map_err(|e| BotError::Malformed(format!("sendMessage params: {}", e)))?;
        self.invoke("sendMessage", params).await?;
        debug!(chat_id = message.chat_id, "응답 전송 완료");
        Ok(())
    }
}
