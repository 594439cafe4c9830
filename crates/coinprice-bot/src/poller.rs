//! Long polling 업데이트 루프.
//!
//! 상태는 두 가지입니다.
//! - **Polling**: 현재 커서로 업데이트를 기다림 (기본 30초)
//! - **Backoff**: 요청 한도 초과 시 서버가 지정한 시간만큼 대기
//!
//! 비어 있지 않은 배치를 받으면 커서를 `max(update_id) + 1`로 옮긴 뒤
//! 배치 순서대로 핸들러에 전달합니다. 핸들러 실패는 로그만 남기고
//! 커서와 루프에는 영향을 주지 않습니다 (at-least-once).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::MessageTransport;
use crate::types::{BotResult, Update};

/// 업데이트 핸들러 trait.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// 업데이트 하나를 처리합니다.
    async fn handle(&self, update: &Update) -> anyhow::Result<()>;
}

/// 폴러 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// long poll 대기 시간
    pub long_poll_timeout: Duration,
    /// 배치 처리 후 다음 사이클 전 대기
    pub idle_pause: Duration,
    /// 전송 실패 후 대기
    pub error_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            long_poll_timeout: Duration::from_secs(30),
            idle_pause: Duration::from_millis(200),
            error_delay: Duration::from_secs(1),
        }
    }
}

/// 한 사이클의 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 빈 배치
    Empty,
    /// 배치 전달 완료 (`failed`는 핸들러가 실패한 업데이트 수)
    Delivered { count: usize, failed: usize },
    /// 요청 한도 초과, 지정된 시간 대기 필요
    RateLimited(Duration),
    /// 그 밖의 전송 실패
    Failed,
}

/// 업데이트 폴러.
pub struct UpdatePoller<T, H> {
    transport: Arc<T>,
    handler: Arc<H>,
    config: PollerConfig,
    cursor: Option<i64>,
}

impl<T, H> UpdatePoller<T, H>
where
    T: MessageTransport,
    H: UpdateHandler,
{
    /// 새 폴러 생성. 커서는 비어 있는 상태(서버 기본값)로 시작합니다.
    pub fn new(transport: Arc<T>, handler: Arc<H>) -> Self {
        Self {
            transport,
            handler,
            config: PollerConfig::default(),
            cursor: None,
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// 현재 커서.
    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    /// 한 사이클 실행 (대기 없음).
    pub async fn poll_once(&mut self) -> PollOutcome {
        let fetched = self.fetch().await;
        self.process(fetched).await
    }

    /// 사이클 결과에 따른 다음 사이클 전 대기 시간.
    pub fn delay_after(&self, outcome: &PollOutcome) -> Duration {
        match outcome {
            PollOutcome::Empty | PollOutcome::Delivered { .. } => self.config.idle_pause,
            PollOutcome::RateLimited(wait) => *wait,
            PollOutcome::Failed => self.config.error_delay,
        }
    }

    /// 중지 신호가 올 때까지 폴링.
    ///
    /// 진행 중인 배치는 끝까지 전달한 뒤 종료합니다.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(cursor = ?self.cursor, "업데이트 폴링 시작");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                fetched = self.fetch() => fetched,
            };

            let outcome = self.process(fetched).await;
            let delay = self.delay_after(&outcome);

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(cursor = ?self.cursor, "업데이트 폴링 종료");
    }

    async fn fetch(&self) -> BotResult<Vec<Update>> {
        self.transport
            .get_updates(self.cursor, self.config.long_poll_timeout)
            .await
    }

    async fn process(&mut self, fetched: BotResult<Vec<Update>>) -> PollOutcome {
        let updates = match fetched {
            Ok(updates) => updates,
            Err(e) => {
                return match e.retry_after() {
                    Some(wait) => {
                        warn!(cursor = ?self.cursor, "요청 한도 초과, {:?} 대기", wait);
                        PollOutcome::RateLimited(wait)
                    }
                    None => {
                        error!(cursor = ?self.cursor, "업데이트 폴링 실패: {}", e);
                        PollOutcome::Failed
                    }
                };
            }
        };

        let Some(max_id) = updates.iter().map(|u| u.update_id).max() else {
            return PollOutcome::Empty;
        };

        // 커서는 뒤로 가지 않음
        let next = max_id + 1;
        self.cursor = Some(self.cursor.map_or(next, |c| c.max(next)));
        debug!(count = updates.len(), cursor = next, "업데이트 수신");

        let mut failed = 0;
        for update in &updates {
            if !self.dispatch(update).await {
                failed += 1;
            }
        }

        PollOutcome::Delivered {
            count: updates.len(),
            failed,
        }
    }

    /// 핸들러 호출. 에러와 패닉 모두 여기서 흡수합니다.
    async fn dispatch(&self, update: &Update) -> bool {
        match AssertUnwindSafe(self.handler.handle(update))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(update_id = update.update_id, "업데이트 처리 실패: {:#}", e);
                false
            }
            Err(_) => {
                error!(update_id = update.update_id, "업데이트 처리 중 패닉 발생");
                false
            }
        }
    }
}
