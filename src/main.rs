/// main.rs — Live/paper trading entry point
///
/// FLOW:
///   1. Load config from .env (START_MODE, API keys, strategy params)
///   2. Build the trade engine (paper or signed Binance USDT-M) and a
///      public data client for candles
///   3. Run the startup restore pass (re-protect naked bot positions)
///   4. Spawn the restore watch and the strategy loop behind RuntimeHandles
///   5. On ctrl-c, signal shutdown and drain both tasks gracefully
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trend_engine::config::{AppConfig, StartMode};
use trend_engine::exchange::binance::BinanceUsdm;
use trend_engine::exchange::paper::PaperExchange;
use trend_engine::exchange::ExchangeAdapter;
use trend_engine::ledger::TagStore;
use trend_engine::restore::RestoreEngine;
use trend_engine::runtime::RuntimeHandle;
use trend_engine::strategy::StrategyLoop;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════╗");
    info!("║     TREND ENGINE  —  BREAKOUT/TREND BOT     ║");
    info!("║  5m breakout + 1h trend filter + brackets   ║");
    info!("╚══════════════════════════════════════════════╝");

    let cfg = AppConfig::from_env()?;
    if cfg.start_mode == StartMode::Live && !cfg.is_testnet {
        warn!("⚠️  LIVE MODE — REAL MONEY — ensure all parameters are correct!");
    }

    // ── Trade engine ─────────────────────────────────────────────────────
    let trade: Arc<dyn ExchangeAdapter> = match cfg.start_mode {
        StartMode::Paper => {
            info!("[MAIN] paper engine active");
            Arc::new(PaperExchange::new())
        }
        StartMode::Live => Arc::new(
            BinanceUsdm::connect(
                &cfg.api_key,
                &cfg.api_secret,
                cfg.is_testnet,
                cfg.default_leverage,
            )
            .await?,
        ),
    };

    // ── Candle data client (always the public REST API) ──────────────────
    let data: Arc<dyn ExchangeAdapter> = match cfg.start_mode {
        StartMode::Live if cfg.is_testnet == cfg.data_is_testnet => trade.clone(),
        _ => Arc::new(BinanceUsdm::connect("", "", cfg.data_is_testnet, cfg.default_leverage).await?),
    };

    let tags = TagStore::new(&cfg.tag_file, cfg.restore_tag_ttl_hours);

    // ── Restore bootstrap ────────────────────────────────────────────────
    if cfg.restore_on_start {
        info!("[RESTORE] bootstrap enabled");
        let bootstrap = RestoreEngine::new(cfg.clone(), trade.clone(), tags.clone());
        bootstrap.run_pass().await;
    }

    let mut handles = Vec::new();

    if cfg.restore_watch_sec > 0 {
        let engine = RestoreEngine::new(cfg.clone(), trade.clone(), tags.clone());
        handles.push(RuntimeHandle::spawn("restore-watch", move |rx| engine.watch(rx)));
    }

    if cfg.strat_enable {
        let strat = StrategyLoop::new(cfg.clone(), data.clone(), trade.clone(), tags.clone());
        handles.push(RuntimeHandle::spawn("strategy", move |rx| strat.run(rx)));
    } else {
        info!("[MAIN] strategy disabled (STRAT_ENABLE=false)");
    }

    tokio::signal::ctrl_c().await?;
    info!("[MAIN] shutdown signal received");
    for handle in handles {
        handle.stop().await;
    }
    Ok(())
}
