/// config.rs — Centralised configuration loaded from .env
///
/// All parameters consumed by the engine are defined here. Loading happens
/// once at startup; every module borrows &AppConfig (or a clone of it).
use anyhow::{bail, Result};
use std::env;

use crate::exchange::WorkingType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Paper,
    Live,
}

/// Quantity policy: fixed notional vs risk-per-stop-distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingMode {
    FixedUsd,
    Risk,
}

/// What to do when estimated margin exceeds the free balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginMode {
    /// Cap the quantity to the maximum affordable size.
    Shrink,
    /// Skip the entry outright.
    Skip,
}

/// Balance figure feeding dynamic risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    Equity,
    Free,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // ── Mode & credentials ───────────────────────────────────────────
    pub start_mode:       StartMode,
    pub api_key:          String,
    pub api_secret:       String,
    pub is_testnet:       bool,
    /// Candle data client may point at mainnet even when orders go to the
    /// testnet (testnet candles are thin).
    pub data_is_testnet:  bool,
    pub default_leverage: u32,

    // ── Strategy universe ────────────────────────────────────────────
    pub strat_enable:        bool,
    pub symbols:             Vec<String>,
    pub strat_timeframe:     String,
    pub confirm_tf:          String,
    pub strat_poll_sec:      u64,
    pub strat_log_every_bar: bool,

    // ── Indicator windows ────────────────────────────────────────────
    pub strat_ema_fast:     usize,
    pub strat_ema_slow:     usize,
    pub htf_ema_fast:       usize,
    pub htf_ema_slow:       usize,
    pub strat_atr_len:      usize,
    pub strat_atr_ma_len:   usize,
    pub strat_atr_mult:     f64,
    pub strat_breakout_len: usize,
    pub strat_volma_len:    usize,
    pub strat_vol_mult:     f64,

    // ── Position sizing ──────────────────────────────────────────────
    pub position_sizing:     SizingMode,
    pub strat_qty_usd:       f64,
    pub risk_usd:            f64,
    pub min_base_qty:        f64,
    pub strat_leverage:      u32,
    pub risk_dynamic_enable: bool,
    pub risk_pct:            f64,
    pub risk_min_usd:        f64,
    pub risk_max_usd:        f64,
    pub risk_balance_source: BalanceSource,
    pub margin_check_enable: bool,
    pub margin_check_mode:   MarginMode,
    pub margin_fee_buffer:   f64,

    // ── Bracket (OCO emulation) ──────────────────────────────────────
    pub bracket_enable:       bool,
    pub bracket_tp_rr:        f64,
    pub bracket_tp_as_market: bool,
    pub bracket_working_type: WorkingType,

    // ── Restore / reconciliation ─────────────────────────────────────
    pub restore_enable:        bool,
    pub restore_on_start:      bool,
    pub restore_watch_sec:     u64,
    pub restore_only_bot:      bool,
    pub restore_tag_ttl_hours: i64,
    pub restore_size_tol_pct:  f64,
    pub tag_file:              String,

    // ── Webhook auth ─────────────────────────────────────────────────
    pub webhook_token:     String,
    pub allow_local_noauth: bool,
}

impl AppConfig {
    /// Load configuration from environment variables (after dotenv).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // ignore missing .env

        let start_mode = match env::var("START_MODE")
            .unwrap_or_else(|_| "PAPER".into())
            .to_uppercase()
            .as_str()
        {
            "PAPER" => StartMode::Paper,
            "LIVE" => StartMode::Live,
            other => bail!("START_MODE: unknown mode {other:?} (PAPER or LIVE)"),
        };

        let position_sizing = match env::var("POSITION_SIZING")
            .unwrap_or_else(|_| "RISK".into())
            .to_uppercase()
            .as_str()
        {
            "RISK" => SizingMode::Risk,
            "FIXED_USD" => SizingMode::FixedUsd,
            other => bail!("POSITION_SIZING: unknown mode {other:?} (RISK or FIXED_USD)"),
        };

        let margin_check_mode = match env::var("MARGIN_CHECK_MODE")
            .unwrap_or_else(|_| "SHRINK".into())
            .to_uppercase()
            .as_str()
        {
            "SHRINK" => MarginMode::Shrink,
            "SKIP" => MarginMode::Skip,
            other => bail!("MARGIN_CHECK_MODE: unknown mode {other:?} (SHRINK or SKIP)"),
        };

        let risk_balance_source = match env::var("RISK_BALANCE_SOURCE")
            .unwrap_or_else(|_| "FREE".into())
            .to_uppercase()
            .as_str()
        {
            "FREE" => BalanceSource::Free,
            "EQUITY" => BalanceSource::Equity,
            other => bail!("RISK_BALANCE_SOURCE: unknown source {other:?} (FREE or EQUITY)"),
        };

        let working_type_raw =
            env::var("BRACKET_WORKING_TYPE").unwrap_or_else(|_| "MARK_PRICE".into());
        let bracket_working_type = match WorkingType::parse(&working_type_raw) {
            Some(wt) => wt,
            None => bail!("BRACKET_WORKING_TYPE: unknown type {working_type_raw:?}"),
        };

        let symbols: Vec<String> = env::var("STRAT_SYMBOLS")
            .unwrap_or_else(|_| "BTCUSDT".into())
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            start_mode,
            api_key:    env::var("API_KEY").unwrap_or_default(),
            api_secret: env::var("API_SECRET").unwrap_or_default(),
            is_testnet:       parse_bool("IS_TESTNET", true),
            data_is_testnet:  parse_bool("DATA_IS_TESTNET", false),
            default_leverage: parse_env::<u32>("DEFAULT_LEVERAGE", 5)?,

            strat_enable: parse_bool("STRAT_ENABLE", false),
            symbols,
            strat_timeframe: env::var("STRAT_TIMEFRAME").unwrap_or_else(|_| "5m".into()),
            confirm_tf:      env::var("CONFIRM_TF").unwrap_or_else(|_| "1h".into()),
            strat_poll_sec:      parse_env("STRAT_POLL_SEC", 5u64)?,
            strat_log_every_bar: parse_bool("STRAT_LOG_EVERY_BAR", false),

            strat_ema_fast:     parse_env("STRAT_EMA_FAST", 20usize)?,
            strat_ema_slow:     parse_env("STRAT_EMA_SLOW", 60usize)?,
            htf_ema_fast:       parse_env("HTF_EMA_FAST", 50usize)?,
            htf_ema_slow:       parse_env("HTF_EMA_SLOW", 200usize)?,
            strat_atr_len:      parse_env("STRAT_ATR_LEN", 14usize)?,
            strat_atr_ma_len:   parse_env("STRAT_ATR_MA_LEN", 20usize)?,
            strat_atr_mult:     parse_env("STRAT_ATR_MULT", 1.5)?,
            strat_breakout_len: parse_env("STRAT_BREAKOUT_LEN", 20usize)?,
            strat_volma_len:    parse_env("STRAT_VOLMA_LEN", 5usize)?,
            strat_vol_mult:     parse_env("STRAT_VOL_MULT", 1.5)?,

            position_sizing,
            strat_qty_usd:  parse_env("STRAT_QTY_USD", 100.0)?,
            risk_usd:       parse_env("RISK_USD", 10.0)?,
            min_base_qty:   parse_env("MIN_BASE_QTY", 0.0001)?,
            strat_leverage: parse_env::<u32>("STRAT_LEVERAGE", 5)?,
            risk_dynamic_enable: parse_bool("RISK_DYNAMIC_ENABLE", false),
            risk_pct:            parse_env("RISK_PCT", 0.01)?,
            risk_min_usd:        parse_env("RISK_MIN_USD", 5.0)?,
            risk_max_usd:        parse_env("RISK_MAX_USD", 100.0)?,
            risk_balance_source,
            margin_check_enable: parse_bool("MARGIN_CHECK_ENABLE", false),
            margin_check_mode,
            margin_fee_buffer: parse_env("MARGIN_FEE_BUFFER", 0.001)?,

            bracket_enable:       parse_bool("BRACKET_ENABLE", true),
            bracket_tp_rr:        parse_env("BRACKET_TP_RR", 2.0)?,
            bracket_tp_as_market: parse_bool("BRACKET_TP_AS_MARKET", true),
            bracket_working_type,

            restore_enable:        parse_bool("RESTORE_ENABLE", true),
            restore_on_start:      parse_bool("RESTORE_ON_START", true),
            restore_watch_sec:     parse_env("RESTORE_WATCH_SEC", 300u64)?,
            restore_only_bot:      parse_bool("RESTORE_ONLY_BOT", true),
            restore_tag_ttl_hours: parse_env("RESTORE_TAG_TTL_HOURS", 48i64)?,
            restore_size_tol_pct:  parse_env("RESTORE_SIZE_TOL_PCT", 5.0)?,
            tag_file: env::var("TAG_FILE")
                .unwrap_or_else(|_| "state/position_tags.json".into()),

            webhook_token:      env::var("WEBHOOK_TOKEN").unwrap_or_default(),
            allow_local_noauth: parse_bool("ALLOW_LOCAL_NOAUTH", true),
        })
    }

    /// REST base URL for order routing.
    pub fn rest_url(&self) -> String {
        binance_rest_url(self.is_testnet)
    }

    /// REST base URL for the candle data client.
    pub fn data_rest_url(&self) -> String {
        binance_rest_url(self.data_is_testnet)
    }
}

pub fn binance_rest_url(testnet: bool) -> String {
    if testnet {
        "https://testnet.binancefuture.com".into()
    } else {
        "https://fapi.binance.com".into()
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Config key {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
        Err(_) => default,
    }
}
