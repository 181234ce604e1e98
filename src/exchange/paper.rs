/// exchange/paper.rs — Paper trading engine
///
/// In-memory stand-in for the live adapter: positions are netted with an
/// averaged entry price, bracket legs rest as recorded reduceOnly orders,
/// and every fill is journaled. Used for START_MODE=PAPER and as the test
/// engine for the strategy/restore cores. Market data is NOT simulated —
/// candles still come from the real public API via a separate data adapter.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::models::{Kline, OrderReceipt, PositionDetail, PositionSide};

use super::{
    BracketReport, BracketRequest, Capabilities, ExchangeAdapter, ExchangeError, LegResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperOrderKind {
    StopMarket,
    TakeProfitMarket,
    TakeProfit,
}

/// A resting conditional order.
#[derive(Debug, Clone)]
pub struct PaperOrder {
    pub id:          String,
    pub symbol:      String,
    pub exit_side:   &'static str,
    pub kind:        PaperOrderKind,
    pub trigger:     f64,
    pub qty:         f64,
    pub reduce_only: bool,
}

/// Journal of submitted market actions, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperEvent {
    Open { symbol: String, side: PositionSide, qty: f64 },
    CloseAll { symbol: String },
}

#[derive(Debug, Default)]
struct Inner {
    /// symbol -> signed base amount + averaged entry
    positions: HashMap<String, (f64, f64)>,
    orders:    Vec<PaperOrder>,
    marks:     HashMap<String, f64>,
    events:    Vec<PaperEvent>,
}

pub struct PaperExchange {
    state:       Mutex<Inner>,
    next_id:     AtomicU64,
    equity_usd:  Mutex<f64>,
    default_mark: f64,
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperExchange {
    pub fn new() -> Self {
        Self {
            state:        Mutex::new(Inner::default()),
            next_id:      AtomicU64::new(1),
            equity_usd:   Mutex::new(10_000.0),
            default_mark: 50_000.0,
        }
    }

    pub fn set_mark(&self, symbol: &str, price: f64) {
        self.state.lock().unwrap().marks.insert(symbol.to_owned(), price);
    }

    pub fn mark(&self, symbol: &str) -> f64 {
        self.state
            .lock()
            .unwrap()
            .marks
            .get(symbol)
            .copied()
            .unwrap_or(self.default_mark)
    }

    pub fn set_equity(&self, usd: f64) {
        *self.equity_usd.lock().unwrap() = usd;
    }

    pub fn open_orders(&self, symbol: &str) -> Vec<PaperOrder> {
        self.state
            .lock()
            .unwrap()
            .orders
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn events(&self) -> Vec<PaperEvent> {
        self.state.lock().unwrap().events.clone()
    }

    fn next_order_id(&self) -> String {
        format!("paper-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn detail_locked(inner: &Inner, symbol: &str) -> PositionDetail {
        match inner.positions.get(symbol) {
            Some(&(amount, entry)) if amount != 0.0 => PositionDetail {
                side: Some(if amount > 0.0 { PositionSide::Long } else { PositionSide::Short }),
                size: amount.abs(),
                entry_price: Some(entry),
            },
            _ => PositionDetail::default(),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    fn name(&self) -> &'static str {
        "paper"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { supports_balance_query: true }
    }

    async fn fetch_candles(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        Err(ExchangeError::Unsupported("market data"))
    }

    async fn open_market(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: f64,
        leverage: Option<u32>,
    ) -> Result<OrderReceipt, ExchangeError> {
        let order_id = self.next_order_id();
        let mut inner = self.state.lock().unwrap();
        let price = inner.marks.get(symbol).copied().unwrap_or(self.default_mark);
        let (amount, entry) = inner.positions.get(symbol).copied().unwrap_or((0.0, 0.0));

        let signed = if side == PositionSide::Long { qty } else { -qty };
        let new_amount = amount + signed;
        let new_entry = if new_amount == 0.0 {
            0.0
        } else if amount == 0.0 {
            price
        } else {
            (entry * amount + price * signed) / new_amount
        };
        inner.positions.insert(symbol.to_owned(), (new_amount, new_entry));
        inner.events.push(PaperEvent::Open { symbol: symbol.to_owned(), side, qty });

        info!(
            "[PAPER] Open {side} {symbol} {qty:.6}@~{price:.2} lev={}",
            leverage.unwrap_or(1)
        );
        Ok(OrderReceipt::Submitted { order_id })
    }

    async fn close_all(&self, symbol: &str) -> Result<OrderReceipt, ExchangeError> {
        let order_id = self.next_order_id();
        let mut inner = self.state.lock().unwrap();
        let (amount, _) = inner.positions.get(symbol).copied().unwrap_or((0.0, 0.0));
        if amount == 0.0 {
            return Ok(OrderReceipt::NoPosition);
        }
        inner.positions.insert(symbol.to_owned(), (0.0, 0.0));
        inner.events.push(PaperEvent::CloseAll { symbol: symbol.to_owned() });
        info!("[PAPER] Close ALL {symbol}, closed_amount={:.6}", amount.abs());
        Ok(OrderReceipt::Submitted { order_id })
    }

    async fn place_bracket(&self, req: &BracketRequest) -> Result<BracketReport, ExchangeError> {
        let mut report = BracketReport::default();
        let exit_side = req.side.exit_side();

        if let Some(sl) = req.sl_price {
            let id = self.next_order_id();
            self.state.lock().unwrap().orders.push(PaperOrder {
                id: id.clone(),
                symbol: req.symbol.clone(),
                exit_side,
                kind: PaperOrderKind::StopMarket,
                trigger: sl,
                qty: req.qty,
                reduce_only: true,
            });
            report.sl = Some(LegResult::Placed { order_id: id });
        }
        if let Some(tp) = req.tp_price {
            let id = self.next_order_id();
            let kind = if req.tp_as_market {
                PaperOrderKind::TakeProfitMarket
            } else {
                PaperOrderKind::TakeProfit
            };
            self.state.lock().unwrap().orders.push(PaperOrder {
                id: id.clone(),
                symbol: req.symbol.clone(),
                exit_side,
                kind,
                trigger: tp,
                qty: req.qty,
                reduce_only: true,
            });
            report.tp = Some(LegResult::Placed { order_id: id });
        }
        Ok(report)
    }

    async fn cancel_reduces_if_flat(&self, symbol: &str) -> Result<(), ExchangeError> {
        let mut inner = self.state.lock().unwrap();
        let (amount, _) = inner.positions.get(symbol).copied().unwrap_or((0.0, 0.0));
        if amount != 0.0 {
            return Ok(());
        }
        inner.orders.retain(|o| !(o.symbol == symbol && o.reduce_only));
        Ok(())
    }

    async fn has_reduce_only(&self, symbol: &str) -> Result<bool, ExchangeError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .orders
            .iter()
            .any(|o| o.symbol == symbol && o.reduce_only))
    }

    async fn get_position_detail(&self, symbol: &str) -> Result<PositionDetail, ExchangeError> {
        Ok(Self::detail_locked(&self.state.lock().unwrap(), symbol))
    }

    async fn get_equity(&self) -> Result<Option<f64>, ExchangeError> {
        Ok(Some(*self.equity_usd.lock().unwrap()))
    }

    async fn get_free_balance(&self) -> Result<Option<f64>, ExchangeError> {
        Ok(Some(*self.equity_usd.lock().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_then_close_roundtrip() {
        let ex = PaperExchange::new();
        ex.set_mark("BTCUSDT", 100.0);
        ex.open_market("BTCUSDT", PositionSide::Long, 0.5, Some(5)).await.unwrap();

        let pos = ex.get_position_detail("BTCUSDT").await.unwrap();
        assert_eq!(pos.side, Some(PositionSide::Long));
        assert_eq!(pos.size, 0.5);
        assert_eq!(pos.entry_price, Some(100.0));

        assert_eq!(ex.close_all("BTCUSDT").await.unwrap(), OrderReceipt::Submitted { order_id: "paper-2".into() });
        assert!(ex.get_position_detail("BTCUSDT").await.unwrap().is_flat());
        // closing again is a no-op
        assert_eq!(ex.close_all("BTCUSDT").await.unwrap(), OrderReceipt::NoPosition);
    }

    #[tokio::test]
    async fn netting_flips_through_zero() {
        let ex = PaperExchange::new();
        ex.set_mark("ETHUSDT", 2_000.0);
        ex.open_market("ETHUSDT", PositionSide::Short, 1.0, None).await.unwrap();
        ex.open_market("ETHUSDT", PositionSide::Long, 1.5, None).await.unwrap();
        let pos = ex.get_position_detail("ETHUSDT").await.unwrap();
        assert_eq!(pos.side, Some(PositionSide::Long));
        assert!((pos.size - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn cancel_reduces_only_when_flat() {
        let ex = PaperExchange::new();
        ex.set_mark("BTCUSDT", 100.0);
        ex.open_market("BTCUSDT", PositionSide::Long, 0.5, None).await.unwrap();
        let req = BracketRequest {
            symbol: "BTCUSDT".into(),
            side: PositionSide::Long,
            qty: 0.5,
            sl_price: Some(85.0),
            tp_price: Some(130.0),
            tp_as_market: true,
            working_type: crate::exchange::WorkingType::MarkPrice,
        };
        ex.place_bracket(&req).await.unwrap();
        assert_eq!(ex.open_orders("BTCUSDT").len(), 2);

        // position still open: cleanup is a no-op
        ex.cancel_reduces_if_flat("BTCUSDT").await.unwrap();
        assert_eq!(ex.open_orders("BTCUSDT").len(), 2);

        // flat: every reduceOnly order is cancelled
        ex.close_all("BTCUSDT").await.unwrap();
        ex.cancel_reduces_if_flat("BTCUSDT").await.unwrap();
        assert!(ex.open_orders("BTCUSDT").is_empty());
    }
}
