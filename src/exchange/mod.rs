/// exchange/mod.rs — Exchange adapter boundary
///
/// Every core component talks to the exchange through [`ExchangeAdapter`];
/// nothing above this trait knows whether orders go to Binance or to the
/// paper engine. Optional abilities are declared once at construction via
/// [`Capabilities`] — callers check the flag instead of probing per call.
pub mod binance;
pub mod paper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Kline, OrderReceipt, PositionDetail, PositionSide};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// Exchange-side rejection with its own error code.
    #[error("exchange api error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("malformed exchange response: {0}")]
    Decode(String),

    #[error("{0} is not supported by this adapter")]
    Unsupported(&'static str),
}

/// Optional adapter abilities, resolved at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// Equity / free-balance queries are available (requires credentials).
    pub supports_balance_query: bool,
}

/// Trigger-price reference for conditional orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkingType {
    MarkPrice,
    ContractPrice,
}

impl WorkingType {
    pub fn as_param(self) -> &'static str {
        match self {
            WorkingType::MarkPrice => "MARK_PRICE",
            WorkingType::ContractPrice => "CONTRACT_PRICE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MARK_PRICE" => Some(WorkingType::MarkPrice),
            "CONTRACT_PRICE" => Some(WorkingType::ContractPrice),
            _ => None,
        }
    }
}

/// One bracket submission. Both legs exit the same position side for the
/// same amount; a leg with no price is simply not requested.
#[derive(Debug, Clone)]
pub struct BracketRequest {
    pub symbol:       String,
    pub side:         PositionSide,
    pub qty:          f64,
    pub sl_price:     Option<f64>,
    pub tp_price:     Option<f64>,
    pub tp_as_market: bool,
    pub working_type: WorkingType,
}

#[derive(Debug, Clone)]
pub enum LegResult {
    Placed { order_id: String },
    Rejected { reason: String },
}

impl LegResult {
    pub fn is_placed(&self) -> bool {
        matches!(self, LegResult::Placed { .. })
    }
}

/// Per-leg outcome of a bracket submission. A `None` leg was not requested;
/// a rejected leg is reported here, never silently dropped.
#[derive(Debug, Clone, Default)]
pub struct BracketReport {
    pub sl: Option<LegResult>,
    pub tp: Option<LegResult>,
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError>;

    /// Market entry. `leverage` is applied best-effort before the order.
    async fn open_market(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: f64,
        leverage: Option<u32>,
    ) -> Result<OrderReceipt, ExchangeError>;

    /// Close the whole position with a reduceOnly market order.
    /// Returns [`OrderReceipt::NoPosition`] when already flat.
    async fn close_all(&self, symbol: &str) -> Result<OrderReceipt, ExchangeError>;

    /// Submit the stop and/or target leg independently; one leg failing must
    /// not roll back the other.
    async fn place_bracket(&self, req: &BracketRequest) -> Result<BracketReport, ExchangeError>;

    /// Best-effort janitor: when the symbol is flat, cancel every open
    /// reduceOnly order; per-order failures are logged, not escalated.
    async fn cancel_reduces_if_flat(&self, symbol: &str) -> Result<(), ExchangeError>;

    /// Whether any open reduceOnly order exists for the symbol.
    async fn has_reduce_only(&self, symbol: &str) -> Result<bool, ExchangeError>;

    async fn get_position_detail(&self, symbol: &str) -> Result<PositionDetail, ExchangeError>;

    /// Account equity; `Ok(None)` when the venue cannot report it.
    async fn get_equity(&self) -> Result<Option<f64>, ExchangeError> {
        Ok(None)
    }

    /// Free (available) balance; `Ok(None)` when the venue cannot report it.
    async fn get_free_balance(&self) -> Result<Option<f64>, ExchangeError> {
        Ok(None)
    }
}
