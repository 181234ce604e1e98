use serde::{Deserialize, Serialize};

/// One OHLCV bar. `open_time` is the bar-open timestamp in epoch milliseconds.
///
/// In a freshly fetched series the last element may be the still-forming bar;
/// index `n-2` is the most recent *closed* bar and the only one decisions may
/// read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub volume:    f64,
}

/// Direction of an open futures position. "Flat" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Order side that opens or extends this position.
    pub fn order_side(self) -> &'static str {
        match self {
            PositionSide::Long => "BUY",
            PositionSide::Short => "SELL",
        }
    }

    /// Order side that reduces or exits this position.
    pub fn exit_side(self) -> &'static str {
        match self {
            PositionSide::Long => "SELL",
            PositionSide::Short => "BUY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live position as reported by the exchange. `size` is unsigned;
/// `size == 0` is flat, never a valid nonzero-side state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionDetail {
    pub side:        Option<PositionSide>,
    pub size:        f64,
    pub entry_price: Option<f64>,
}

impl PositionDetail {
    pub fn is_flat(&self) -> bool {
        self.size == 0.0 || self.side.is_none()
    }
}

/// Receipt for a market entry or close submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderReceipt {
    Submitted { order_id: String },
    /// `close_all` on an already-flat symbol.
    NoPosition,
}

/// Per-symbol evaluator cache. Created on first evaluation, kept for the
/// process lifetime; trade fields are superseded on each new entry.
#[derive(Debug, Clone, Default)]
pub struct SymbolState {
    pub last_bar_ts: Option<i64>,
    pub entry_price: Option<f64>,
    pub sl_price:    Option<f64>,
    pub tp_price:    Option<f64>,
}
