/// restore.rs — Startup/periodic position reconciliation
///
/// After a restart (or a crash mid-bracket-placement) live positions can be
/// left without protection. Each pass compares exchange-reported positions
/// against the ownership ledger and re-establishes missing brackets — but
/// only for positions this bot verifiably opened. A manually opened
/// position is never touched, and SL/TP prices are never synthesized out of
/// thin air: restoration without a complete tag is a refusal, not a guess.
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::bracket::{BracketManager, BracketStatus};
use crate::config::AppConfig;
use crate::exchange::ExchangeAdapter;
use crate::ledger::TagStore;

/// Per-symbol result of one restore pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// No live position; nothing to restore.
    Flat,
    /// A reduceOnly order already rests for the symbol.
    AlreadyProtected,
    /// Naked position found, but restore (or brackets) are globally
    /// disabled — warn-only manual-review mode.
    RestoreDisabled,
    /// No valid tag and the bot-owned-only policy is active.
    NotOwned,
    /// Tag exists but disagrees with the live side — stale or corrupt
    /// ledger; never guess.
    SideMismatch,
    /// Tag lacks an SL or TP price; blind partial protection is not
    /// attempted.
    MissingPrices,
    /// No tag, bot-owned-only disabled: still refuse to invent prices.
    Declined,
    /// Protection re-established with the given quantity.
    Restored { qty: f64 },
    /// Query/submission failure; the symbol is skipped this pass.
    Failed(String),
}

pub struct RestoreEngine {
    cfg:      AppConfig,
    trade:    Arc<dyn ExchangeAdapter>,
    brackets: BracketManager,
    tags:     TagStore,
}

impl RestoreEngine {
    pub fn new(cfg: AppConfig, trade: Arc<dyn ExchangeAdapter>, tags: TagStore) -> Self {
        let brackets = BracketManager::new(
            trade.clone(),
            cfg.bracket_tp_as_market,
            cfg.bracket_working_type,
        );
        Self { cfg, trade, brackets, tags }
    }

    pub async fn restore_symbol(&self, symbol: &str) -> RestoreOutcome {
        let pos = match self.trade.get_position_detail(symbol).await {
            Ok(p) => p,
            Err(e) => {
                warn!("[RESTORE]{symbol} position query failed: {e}");
                return RestoreOutcome::Failed(e.to_string());
            }
        };
        let Some(live_side) = pos.side.filter(|_| !pos.is_flat()) else {
            info!("[RESTORE]{symbol} no position; nothing to restore.");
            return RestoreOutcome::Flat;
        };

        match self.trade.has_reduce_only(symbol).await {
            Ok(true) => {
                info!(
                    "[RESTORE]{symbol} side={live_side} size={} entry={:?} reduceOnly protection in place",
                    pos.size, pos.entry_price
                );
                return RestoreOutcome::AlreadyProtected;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("[RESTORE]{symbol} open-order probe failed: {e}");
                return RestoreOutcome::Failed(e.to_string());
            }
        }

        // position is naked from here on
        if !self.cfg.restore_enable || !self.cfg.bracket_enable {
            warn!(
                "[RESTORE]{symbol} reduceOnly SL/TP not found. (manual check recommended)"
            );
            return RestoreOutcome::RestoreDisabled;
        }

        let tag = match self.tags.get(symbol) {
            Ok(t) => t,
            Err(e) => {
                // ledger unreadable: degrade to bot-owned-only refusal
                warn!("[RESTORE]{symbol} ledger read failed, skipping: {e}");
                return RestoreOutcome::Failed(e.to_string());
            }
        };

        let Some(tag) = tag else {
            if self.cfg.restore_only_bot {
                info!("[RESTORE]{symbol} no valid bot tag; foreign/manual position untouched");
                return RestoreOutcome::NotOwned;
            }
            // even without the ownership restriction, SL/TP are never invented
            warn!("[RESTORE]{symbol} naked position without a tag; declining to synthesize SL/TP");
            return RestoreOutcome::Declined;
        };

        if tag.side != live_side {
            warn!(
                "[RESTORE]{symbol} SAFETY: tag side {} != live side {live_side}; ledger stale or corrupted, aborting",
                tag.side
            );
            return RestoreOutcome::SideMismatch;
        }

        let (Some(sl), Some(tp)) = (tag.sl, tag.tp) else {
            warn!("[RESTORE]{symbol} tag missing SL/TP price; not attempting partial protection");
            return RestoreOutcome::MissingPrices;
        };

        let qty = pos.size.min(tag.qty);
        let divergence_pct = if tag.qty > 0.0 {
            ((pos.size - tag.qty).abs() / tag.qty) * 100.0
        } else {
            0.0
        };
        if divergence_pct > self.cfg.restore_size_tol_pct {
            warn!(
                "[RESTORE]{symbol} size divergence {divergence_pct:.1}% (live={} tag={}); capping bracket to {qty}",
                pos.size, tag.qty
            );
        }

        match self
            .brackets
            .place(symbol, live_side, qty, Some(sl), Some(tp))
            .await
        {
            BracketStatus::Failed => RestoreOutcome::Failed("bracket submission failed".into()),
            _ => {
                info!("[RESTORE]{symbol} protection restored: qty={qty} SL={sl} TP={tp}");
                RestoreOutcome::Restored { qty }
            }
        }
    }

    /// One sweep over every configured symbol.
    pub async fn run_pass(&self) {
        for symbol in &self.cfg.symbols {
            let _ = self.restore_symbol(symbol).await;
        }
    }

    /// Background sweep on a fixed interval; positions opened while the
    /// service was down, or brackets lost to a crash mid-placement,
    /// self-heal without manual intervention.
    pub async fn watch(self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.cfg.restore_watch_sec.max(1));
        info!("[RESTORE] watch every {}s", interval.as_secs());
        loop {
            tokio::select! {
                _ = sleep(interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                info!("[RESTORE] stop signal received; watch exiting");
                return;
            }
            self.run_pass().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::paper::PaperExchange;
    use crate::ledger::PositionTag;
    use crate::models::PositionSide;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    static SEQ: AtomicU64 = AtomicU64::new(0);

    fn temp_tags() -> TagStore {
        let n = SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "trend_engine_restore_{}_{n}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        TagStore::new(path, 48)
    }

    fn test_cfg() -> AppConfig {
        let mut cfg = AppConfig::from_env().expect("config");
        cfg.symbols = vec!["BTCUSDT".into()];
        cfg.restore_enable = true;
        cfg.restore_only_bot = true;
        cfg.restore_size_tol_pct = 5.0;
        cfg.bracket_enable = true;
        cfg
    }

    fn tag(side: PositionSide, qty: f64, age_hours: i64) -> PositionTag {
        PositionTag {
            ts_created: Utc::now() - ChronoDuration::hours(age_hours),
            side,
            qty,
            entry: 100.0,
            sl: Some(85.0),
            tp: Some(130.0),
            stop_distance: 15.0,
        }
    }

    async fn engine_with_long_position(
        cfg: AppConfig,
        size: f64,
    ) -> (RestoreEngine, Arc<PaperExchange>, TagStore) {
        let paper = Arc::new(PaperExchange::new());
        paper.set_mark("BTCUSDT", 100.0);
        paper
            .open_market("BTCUSDT", PositionSide::Long, size, None)
            .await
            .unwrap();
        let tags = temp_tags();
        let engine = RestoreEngine::new(cfg, paper.clone(), tags.clone());
        (engine, paper, tags)
    }

    #[tokio::test]
    async fn flat_symbol_restores_nothing() {
        let paper = Arc::new(PaperExchange::new());
        let engine = RestoreEngine::new(test_cfg(), paper.clone(), temp_tags());
        assert_eq!(engine.restore_symbol("BTCUSDT").await, RestoreOutcome::Flat);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn owned_position_gets_exactly_one_bracket() {
        let (engine, paper, tags) = engine_with_long_position(test_cfg(), 0.5).await;
        tags.upsert("BTCUSDT", tag(PositionSide::Long, 0.5, 0)).unwrap();

        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::Restored { qty: 0.5 });

        let orders = paper.open_orders("BTCUSDT");
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.reduce_only));
        assert!(orders.iter().all(|o| (o.qty - 0.5).abs() < 1e-12));
    }

    #[tokio::test]
    async fn bracket_qty_is_min_of_live_and_tag() {
        let (engine, paper, tags) = engine_with_long_position(test_cfg(), 0.5).await;
        tags.upsert("BTCUSDT", tag(PositionSide::Long, 0.3, 0)).unwrap();

        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::Restored { qty: 0.3 });
        assert!(paper
            .open_orders("BTCUSDT")
            .iter()
            .all(|o| (o.qty - 0.3).abs() < 1e-12));
    }

    #[tokio::test]
    async fn untagged_position_is_never_touched() {
        let (engine, paper, _tags) = engine_with_long_position(test_cfg(), 0.5).await;
        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::NotOwned);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn untagged_without_owned_only_still_declines() {
        let mut cfg = test_cfg();
        cfg.restore_only_bot = false;
        let (engine, paper, _tags) = engine_with_long_position(cfg, 0.5).await;
        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::Declined);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn expired_tag_counts_as_foreign() {
        let (engine, paper, tags) = engine_with_long_position(test_cfg(), 0.5).await;
        tags.upsert("BTCUSDT", tag(PositionSide::Long, 0.5, 49)).unwrap();
        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::NotOwned);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn side_mismatch_aborts() {
        let (engine, paper, tags) = engine_with_long_position(test_cfg(), 0.5).await;
        tags.upsert("BTCUSDT", tag(PositionSide::Short, 0.5, 0)).unwrap();
        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::SideMismatch);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn missing_tp_aborts_restoration() {
        let (engine, paper, tags) = engine_with_long_position(test_cfg(), 0.5).await;
        let mut t = tag(PositionSide::Long, 0.5, 0);
        t.tp = None;
        tags.upsert("BTCUSDT", t).unwrap();
        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::MissingPrices);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn already_protected_skips() {
        let (engine, paper, tags) = engine_with_long_position(test_cfg(), 0.5).await;
        tags.upsert("BTCUSDT", tag(PositionSide::Long, 0.5, 0)).unwrap();
        assert_eq!(
            engine.restore_symbol("BTCUSDT").await,
            RestoreOutcome::Restored { qty: 0.5 }
        );
        // second pass sees the resting legs and leaves them alone
        assert_eq!(
            engine.restore_symbol("BTCUSDT").await,
            RestoreOutcome::AlreadyProtected
        );
        assert_eq!(paper.open_orders("BTCUSDT").len(), 2);
    }

    #[tokio::test]
    async fn disabled_restore_only_warns() {
        let mut cfg = test_cfg();
        cfg.restore_enable = false;
        let (engine, paper, tags) = engine_with_long_position(cfg, 0.5).await;
        tags.upsert("BTCUSDT", tag(PositionSide::Long, 0.5, 0)).unwrap();
        let out = engine.restore_symbol("BTCUSDT").await;
        assert_eq!(out, RestoreOutcome::RestoreDisabled);
        assert!(paper.open_orders("BTCUSDT").is_empty());
    }
}
