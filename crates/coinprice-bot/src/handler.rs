//! 시세 조회 명령어 핸들러.
//!
//! 명령어를 파싱해 캐시 조회로 바꾸고, 결과를 포맷해 응답합니다.
//! 사용자에게는 간단한 안내만 보내고 자세한 에러는 로그에만 남깁니다.

use std::sync::Arc;

use async_trait::async_trait;
use coinprice_data::{AliasTable, PriceCache};
use tracing::{debug, error, info};

use crate::api::MessageTransport;
use crate::command::BotCommand;
use crate::format::{self, DASHBOARD_KEYS, FAILURE_TEXT};
use crate::poller::UpdateHandler;
use crate::types::{OutgoingMessage, Update};

/// 응답 본문.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Markdown (링크 미리보기 끔)
    Markdown(String),
    /// 일반 텍스트
    Plain(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Markdown(text) | Reply::Plain(text) => text,
        }
    }

    fn into_message(self, chat_id: i64) -> OutgoingMessage {
        match self {
            Reply::Markdown(text) => OutgoingMessage::markdown(chat_id, text),
            Reply::Plain(text) => OutgoingMessage::plain(chat_id, text),
        }
    }
}

/// 시세 봇 핸들러.
pub struct PriceBot<T: MessageTransport> {
    transport: Arc<T>,
    cache: Arc<PriceCache>,
    aliases: AliasTable,
    username: String,
}

impl<T: MessageTransport> PriceBot<T> {
    pub fn new(
        transport: Arc<T>,
        cache: Arc<PriceCache>,
        aliases: AliasTable,
        username: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            cache,
            aliases,
            username: username.into(),
        }
    }

    /// 명령어 하나에 대한 응답. 응답하지 않는 명령어면 `None`.
    pub async fn reply_to(&self, text: &str) -> Option<Reply> {
        let command = BotCommand::parse(text, &self.username)?;
        debug!(command = ?command, "명령어 수신");

        match command {
            BotCommand::Dashboard => Some(self.dashboard(text).await),
            BotCommand::Quote(argument) => Some(self.quote(text, &argument).await),
            BotCommand::Start | BotCommand::Unknown(_) => None,
        }
    }

    async fn dashboard(&self, text: &str) -> Reply {
        let results = self.cache.get_many(DASHBOARD_KEYS).await;
        match format::dashboard(results) {
            Ok(body) => Reply::Markdown(body),
            Err(e) => {
                error!("명령어 처리 실패 ({}): {}", text, e);
                Reply::Markdown(FAILURE_TEXT.to_string())
            }
        }
    }

    async fn quote(&self, text: &str, argument: &str) -> Reply {
        let Some(key) = self.aliases.resolve(argument) else {
            return Reply::Plain(format::no_source_text(argument));
        };

        match self.cache.get(&key).await {
            Ok(quote) => Reply::Markdown(format::quote_link(&key, &quote)),
            Err(e) if e.is_unknown_symbol() => Reply::Plain(format::no_source_text(argument)),
            Err(e) => {
                error!("명령어 처리 실패 ({}): {}", text, e);
                Reply::Plain(FAILURE_TEXT.to_string())
            }
        }
    }
}

#[async_trait]
impl<T: MessageTransport> UpdateHandler for PriceBot<T> {
    async fn handle(&self, update: &Update) -> anyhow::Result<()> {
        let Some(message) = &update.message else {
            return Ok(());
        };
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        let Some(reply) = self.reply_to(text).await else {
            return Ok(());
        };

        let chat_id = message.chat.id;
        info!(chat_id = chat_id, "query: {}", format::strip_links(reply.text()));
        self.transport
            .send_message(&reply.into_message(chat_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BotResult, Chat, Message, ParseMode};
    use chrono::Utc;
    use coinprice_data::{
        CacheConfig, DataError, MarketSet, Quote, QuoteBatch, QuoteProvider,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    /// 고정 값을 돌려주는 제공자
    struct StaticProvider {
        markets: MarketSet,
        values: Vec<(&'static str, &'static str)>,
        fail: bool,
    }

    #[async_trait]
    impl QuoteProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn markets(&self) -> &MarketSet {
            &self.markets
        }

        async fn fetch(&self, _key: &str) -> coinprice_data::Result<QuoteBatch> {
            if self.fail {
                return Err(DataError::fetch_failed("static", "HTTP 503"));
            }
            Ok(self
                .values
                .iter()
                .map(|(k, v)| (k.to_string(), Quote::new(*v, Utc::now(), "https://example.com/")))
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn get_updates(&self, _offset: Option<i64>, _timeout: Duration) -> BotResult<Vec<Update>> {
            Ok(Vec::new())
        }

        async fn send_message(&self, message: &OutgoingMessage) -> BotResult<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    const VALUES: &[(&str, &str)] = &[
        ("BTC_USD", "9000"),
        ("BTC_CNY", "60000"),
        ("LTC_BTC", "0.01"),
        ("LTC_CNY", "600"),
        ("USD_CNY", "6.9"),
        ("JPY_CNY", "0.06"),
        ("ETH_BTC", "0.05"),
        ("ZEC_BTC", "0.02"),
        ("XMR_BTC", "0.015"),
    ];

    fn bot(fail: bool) -> (PriceBot<RecordingTransport>, Arc<RecordingTransport>) {
        let provider = StaticProvider {
            markets: MarketSet::from_keys(VALUES.iter().map(|(k, _)| *k)),
            values: VALUES.to_vec(),
            fail,
        };
        let cache = Arc::new(PriceCache::new(vec![Arc::new(provider)], CacheConfig::default()));
        let aliases = AliasTable::build(cache.market_sets()).unwrap();
        let transport = Arc::new(RecordingTransport::default());
        (
            PriceBot::new(transport.clone(), cache, aliases, "coinprice_bot"),
            transport,
        )
    }

    fn text_update(chat_id: i64, text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                message_id: 1,
                from: None,
                chat: Chat { id: chat_id },
                text: Some(text.to_string()),
                date: 0,
            }),
        }
    }

    #[tokio::test]
    async fn test_dashboard_reply() {
        let (bot, _) = bot(false);

        let reply = bot.reply_to("/query").await.unwrap();
        let Reply::Markdown(text) = reply else {
            panic!("dashboard reply must be markdown");
        };
        assert!(text.contains("[BTCUSD](https://example.com/)=9000"));
        assert!(text.contains("ETHUSD=450.0000"));
    }

    #[tokio::test]
    async fn test_quote_by_alias_and_key() {
        let (bot, _) = bot(false);

        assert_eq!(
            bot.reply_to("/query btcusd").await,
            Some(Reply::Markdown("[BTCUSD](https://example.com/)=9000".to_string()))
        );
        assert_eq!(
            bot.reply_to("/query@coinprice_bot ltc_btc").await,
            Some(Reply::Markdown("[LTCBTC](https://example.com/)=0.01".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_symbol_reply() {
        let (bot, _) = bot(false);

        assert_eq!(
            bot.reply_to("/query dogeusd").await,
            Some(Reply::Plain("We don't have data source for dogeusd.".to_string()))
        );
        assert_eq!(
            bot.reply_to("/query DOGE_USD").await,
            Some(Reply::Plain("We don't have data source for DOGE_USD.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_reply() {
        let (bot, _) = bot(true);

        assert_eq!(
            bot.reply_to("/query btcusd").await,
            Some(Reply::Plain(FAILURE_TEXT.to_string()))
        );
        assert_eq!(
            bot.reply_to("/query").await,
            Some(Reply::Markdown(FAILURE_TEXT.to_string()))
        );
    }

    #[tokio::test]
    async fn test_ignored_commands() {
        let (bot, _) = bot(false);

        assert_eq!(bot.reply_to("/start").await, None);
        assert_eq!(bot.reply_to("/price").await, None);
        assert_eq!(bot.reply_to("hello").await, None);
        assert_eq!(bot.reply_to("/query@other_bot").await, None);
    }

    #[tokio::test]
    async fn test_handle_sends_to_chat() {
        let (bot, transport) = bot(false);

        bot.handle(&text_update(42, "/query ethbtc")).await.unwrap();
        bot.handle(&text_update(42, "/start")).await.unwrap();
        bot.handle(&Update {
            update_id: 3,
            message: None,
        })
        .await
        .unwrap();

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 42);
        assert_eq!(sent[0].text, "[ETHBTC](https://example.com/)=0.05");
        assert_eq!(sent[0].parse_mode, Some(ParseMode::Markdown));
        assert!(sent[0].disable_web_page_preview);
    }
}
