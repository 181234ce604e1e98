/// sizing.rs — Position sizing
///
/// Converts a risk budget plus stop distance into a base-asset quantity.
/// Two modes: FIXED_USD (fixed notional) and RISK (risk USD per stop
/// distance). The risk budget may itself be dynamic (a clamped fraction of
/// equity or free balance), and the final quantity can be margin-capped.
/// Every balance lookup is best-effort — a failed query degrades to the
/// static path with a warning, never blocking the loop.
use tracing::warn;

use crate::config::{AppConfig, BalanceSource, MarginMode, SizingMode};
use crate::exchange::ExchangeAdapter;

/// Raw base quantity before floors and caps.
/// RISK mode with a non-positive stop distance yields zero (no valid entry).
pub fn raw_qty(
    mode: SizingMode,
    qty_usd: f64,
    risk_usd: f64,
    price: f64,
    stop_distance: f64,
) -> f64 {
    match mode {
        SizingMode::Risk => {
            if stop_distance <= 0.0 {
                return 0.0;
            }
            risk_usd / stop_distance
        }
        SizingMode::FixedUsd => qty_usd / price.max(1e-9),
    }
}

/// Dynamic risk budget: a fraction of the account, clamped to a USD band.
pub fn clamp_risk(balance: f64, pct: f64, min_usd: f64, max_usd: f64) -> f64 {
    (balance * pct).clamp(min_usd, max_usd)
}

/// Margin estimate for a prospective entry.
pub fn required_margin(price: f64, qty: f64, leverage: u32, fee_buffer: f64) -> f64 {
    (price * qty / leverage.max(1) as f64) * (1.0 + fee_buffer)
}

/// Apply the margin cap against a known free balance.
/// Shrink mode caps to the maximum affordable size; both modes skip the
/// entry (zero) when even the minimum lot is unaffordable.
pub fn margin_capped_qty(
    qty: f64,
    price: f64,
    leverage: u32,
    fee_buffer: f64,
    free_balance: f64,
    mode: MarginMode,
    min_qty: f64,
) -> f64 {
    let required = required_margin(price, qty, leverage, fee_buffer);
    if required <= free_balance {
        return qty;
    }
    match mode {
        MarginMode::Skip => 0.0,
        MarginMode::Shrink => {
            let per_unit = required_margin(price, 1.0, leverage, fee_buffer);
            if per_unit <= 0.0 {
                return 0.0;
            }
            let affordable = free_balance / per_unit;
            if affordable >= min_qty {
                affordable
            } else {
                0.0
            }
        }
    }
}

/// Resolve the risk budget in USD, querying the account when dynamic risk is
/// enabled. Falls back to the static budget on any lookup failure.
pub async fn resolve_risk_usd(trade: &dyn ExchangeAdapter, cfg: &AppConfig) -> f64 {
    if !cfg.risk_dynamic_enable {
        return cfg.risk_usd;
    }
    if !trade.capabilities().supports_balance_query {
        warn!("[SIZING] dynamic risk requested but {} has no balance query; using static RISK_USD", trade.name());
        return cfg.risk_usd;
    }
    let looked_up = match cfg.risk_balance_source {
        BalanceSource::Equity => trade.get_equity().await,
        BalanceSource::Free => trade.get_free_balance().await,
    };
    match looked_up {
        Ok(Some(balance)) => clamp_risk(balance, cfg.risk_pct, cfg.risk_min_usd, cfg.risk_max_usd),
        Ok(None) => {
            warn!("[SIZING] balance unavailable; using static RISK_USD");
            cfg.risk_usd
        }
        Err(e) => {
            warn!("[SIZING] balance query failed ({e}); using static RISK_USD");
            cfg.risk_usd
        }
    }
}

/// Full entry-quantity pipeline: mode → min-qty floor → optional margin cap.
/// Returns zero when the entry should be skipped.
pub async fn size_entry(
    trade: &dyn ExchangeAdapter,
    cfg: &AppConfig,
    price: f64,
    stop_distance: f64,
) -> f64 {
    let risk_usd = resolve_risk_usd(trade, cfg).await;
    let base = raw_qty(cfg.position_sizing, cfg.strat_qty_usd, risk_usd, price, stop_distance);
    if base <= 0.0 {
        return 0.0;
    }
    let qty = base.max(cfg.min_base_qty);

    if !cfg.margin_check_enable {
        return qty;
    }
    if !trade.capabilities().supports_balance_query {
        return qty;
    }
    let free = match trade.get_free_balance().await {
        Ok(Some(f)) => f,
        Ok(None) => return qty,
        Err(e) => {
            // best-effort: no balance, no cap
            warn!("[SIZING] free-balance query failed ({e}); skipping margin check");
            return qty;
        }
    };
    let capped = margin_capped_qty(
        qty,
        price,
        cfg.strat_leverage,
        cfg.margin_fee_buffer,
        free,
        cfg.margin_check_mode,
        cfg.min_base_qty,
    );
    if capped <= 0.0 {
        warn!(
            "[SIZING] insufficient margin (need ~{:.2} USD, free {:.2}); entry skipped",
            required_margin(price, qty, cfg.strat_leverage, cfg.margin_fee_buffer),
            free
        );
    } else if capped < qty {
        warn!("[SIZING] margin cap shrank qty {qty:.6} -> {capped:.6}");
    }
    capped
}
