/// bracket.rs — Bracket manager (OCO emulation)
///
/// The venue has no native bracket primitive for this product, so a
/// stop-loss and take-profit pair is emulated with two independent
/// reduceOnly conditional orders. No atomicity is claimed: the position can
/// close between the two submissions, leaving an orphaned leg — the
/// periodic flat-cleanup sweep mops that up.
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::exchange::{BracketReport, BracketRequest, ExchangeAdapter, LegResult, WorkingType};
use crate::models::PositionSide;

/// SL/TP prices derived from an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketPlan {
    pub sl: f64,
    pub tp: f64,
    pub stop_distance: f64,
}

/// Stop goes one stop-distance against the position; target goes
/// `rr` stop-distances with it.
pub fn plan(side: PositionSide, entry: f64, stop_distance: f64, rr: f64) -> BracketPlan {
    match side {
        PositionSide::Long => BracketPlan {
            sl: entry - stop_distance,
            tp: entry + stop_distance * rr,
            stop_distance,
        },
        PositionSide::Short => BracketPlan {
            sl: entry + stop_distance,
            tp: entry - stop_distance * rr,
            stop_distance,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketStatus {
    /// Neither price was supplied; nothing submitted.
    Skipped,
    /// Every requested leg is resting on the exchange.
    Placed,
    /// At least one leg was rejected while another went through.
    Partial,
    /// No requested leg made it to the exchange.
    Failed,
}

/// Collapse a per-leg report into an overall status.
pub fn classify(report: &BracketReport) -> BracketStatus {
    let legs: Vec<&LegResult> = report.sl.iter().chain(report.tp.iter()).collect();
    if legs.is_empty() {
        return BracketStatus::Skipped;
    }
    let placed = legs.iter().filter(|l| l.is_placed()).count();
    if placed == legs.len() {
        BracketStatus::Placed
    } else if placed > 0 {
        BracketStatus::Partial
    } else {
        BracketStatus::Failed
    }
}

pub struct BracketManager {
    trade:        Arc<dyn ExchangeAdapter>,
    tp_as_market: bool,
    working_type: WorkingType,
}

impl BracketManager {
    pub fn new(trade: Arc<dyn ExchangeAdapter>, tp_as_market: bool, working_type: WorkingType) -> Self {
        Self { trade, tp_as_market, working_type }
    }

    /// Submit the protective pair. A single leg (only one price supplied) is
    /// valid; with both prices absent the call is skipped entirely and zero
    /// orders are submitted.
    pub async fn place(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: f64,
        sl_price: Option<f64>,
        tp_price: Option<f64>,
    ) -> BracketStatus {
        if sl_price.is_none() && tp_price.is_none() {
            debug!("[BRACKET] {symbol} no SL/TP prices; skipping");
            return BracketStatus::Skipped;
        }
        let req = BracketRequest {
            symbol: symbol.to_owned(),
            side,
            qty,
            sl_price,
            tp_price,
            tp_as_market: self.tp_as_market,
            working_type: self.working_type,
        };
        let report = match self.trade.place_bracket(&req).await {
            Ok(r) => r,
            Err(e) => {
                warn!("[BRACKET] {symbol} submission failed: {e}");
                return BracketStatus::Failed;
            }
        };
        let status = classify(&report);
        match status {
            BracketStatus::Placed => {
                info!(
                    "[BRACKET] {symbol} {side} placed (reduceOnly): SL={:?} TP={:?}",
                    sl_price, tp_price
                );
            }
            BracketStatus::Partial => {
                // partial protection is a distinct condition, not a generic failure
                warn!(
                    "[BRACKET] {symbol} PARTIAL bracket: sl={} tp={}",
                    leg_summary(&report.sl),
                    leg_summary(&report.tp)
                );
            }
            BracketStatus::Failed => {
                warn!(
                    "[BRACKET] {symbol} all legs rejected: sl={} tp={}",
                    leg_summary(&report.sl),
                    leg_summary(&report.tp)
                );
            }
            BracketStatus::Skipped => {}
        }
        status
    }

    /// Best-effort janitor around the adapter's flat cleanup.
    pub async fn cleanup_if_flat(&self, symbol: &str) {
        if let Err(e) = self.trade.cancel_reduces_if_flat(symbol).await {
            warn!("[BRACKET] {symbol} flat-order cleanup failed: {e}");
        }
    }
}

fn leg_summary(leg: &Option<LegResult>) -> String {
    match leg {
        None => "not_requested".into(),
        Some(LegResult::Placed { order_id }) => format!("placed#{order_id}"),
        Some(LegResult::Rejected { reason }) => format!("rejected({reason})"),
    }
}
