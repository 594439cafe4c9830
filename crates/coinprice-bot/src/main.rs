//! 시세 조회 봇 실행 파일.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use coinprice_bot::config::DEFAULT_CONFIG_PATH;
use coinprice_bot::{AppConfig, BotApi, PriceBot, UpdatePoller};
use coinprice_data::{default_providers, AliasTable, PriceCache};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coinprice-bot")]
#[command(about = "Cryptocurrency price query bot", long_about = None)]
#[command(version)]
struct Cli {
    /// 디버그 로그 출력
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 로깅 초기화
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("coinprice_bot={level},coinprice_data={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 설정 로드
    let config = AppConfig::load(DEFAULT_CONFIG_PATH)
        .with_context(|| format!("설정 파일 로드 실패: {}", DEFAULT_CONFIG_PATH))?;
    config.validate()?;
    tracing::debug!(config = ?config, "설정 로드 완료");

    let api = Arc::new(
        BotApi::new(config.bot.apitoken.clone())
            .with_base_url(&config.bot.api_url)
            .with_timeout(config.request_timeout()),
    );

    let username = match config.bot.username() {
        Some(username) => username.to_string(),
        None => {
            let me = api.get_me().await.context("봇 계정 정보 조회 실패")?;
            me.username
                .context("봇 계정에 username이 없습니다 ([Bot] username을 설정하세요)")?
        }
    };
    tracing::info!(username = %username, "봇 계정 확인");

    let cache = Arc::new(PriceCache::new(
        default_providers(reqwest::Client::new()),
        config.cache_config(),
    ));
    let aliases = AliasTable::build(cache.market_sets())?;
    tracing::info!(aliases = aliases.len(), "별칭 테이블 생성");

    let bot = Arc::new(PriceBot::new(api.clone(), cache, aliases, username));
    let mut poller = UpdatePoller::new(api, bot).with_config(config.poller_config());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("종료 신호 수신, 봇 종료 중...");
            signal.cancel();
        }
    });

    poller.run(shutdown).await;
    Ok(())
}
