/// exchange/binance.rs — Binance USDT-M Futures adapter
///
/// Signed REST order flow:
///   1. Build query string with required params
///   2. Append timestamp (server-synced at construction)
///   3. Sign query string with HMAC-SHA256 using the API secret
///   4. Send with X-MBX-APIKEY header
///
/// Brackets are emulated: the venue has no native OCO for futures
/// positions, so the stop leg (STOP_MARKET) and target leg
/// (TAKE_PROFIT_MARKET or TAKE_PROFIT) are submitted independently, both
/// reduceOnly so an oversized leg can never open a new position.
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};

use crate::config::binance_rest_url;
use crate::models::{Kline, OrderReceipt, PositionDetail, PositionSide};
use crate::time_sync::TimeSync;

use super::{
    BracketReport, BracketRequest, Capabilities, ExchangeAdapter, ExchangeError, LegResult,
};

use async_trait::async_trait;

type HmacSha256 = Hmac<Sha256>;

// ── Response types ────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: i64,
    pub symbol:   String,
    pub status:   String,
    pub side:     String,
}

#[derive(Deserialize, Debug)]
struct BinanceApiError {
    code: i64,
    msg:  String,
}

#[derive(Deserialize, Debug)]
struct BalanceEntry {
    asset: String,
    #[serde(rename = "availableBalance")]
    available_balance: String,
}

// ── Adapter ───────────────────────────────────────────────────────────────

pub struct BinanceUsdm {
    client:           Client,
    api_key:          String,
    api_secret:       String,
    base_url:         String,
    default_leverage: u32,
    capabilities:     Capabilities,
    time_sync:        TimeSync,
}

impl BinanceUsdm {
    /// Build the adapter and sync server time once. A keyless instance is a
    /// valid public-data client (candles only, no balance capability).
    pub async fn connect(
        api_key: &str,
        api_secret: &str,
        testnet: bool,
        default_leverage: u32,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        let base_url = binance_rest_url(testnet);

        let mut time_sync = TimeSync::new();
        if let Err(e) = time_sync.sync(&client, &base_url).await {
            warn!("[BINANCE] time sync failed, falling back to local clock: {e}");
        }

        info!("[BINANCE] connected base={base_url} sandbox={testnet}");
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            api_secret: api_secret.to_owned(),
            base_url,
            default_leverage,
            capabilities: Capabilities { supports_balance_query: !api_key.is_empty() },
            time_sync,
        })
    }

    /// Sign a query string with HMAC-SHA256.
    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_query(&self, params: &str) -> String {
        let ts = self.time_sync.timestamp_ms();
        let with_ts = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let signature = self.sign(&with_ts);
        format!("{with_ts}&signature={signature}")
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ExchangeError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Err(match serde_json::from_str::<BinanceApiError>(&body) {
                Ok(e) => ExchangeError::Api { code: e.code, msg: e.msg },
                Err(_) => ExchangeError::Decode(format!("HTTP {status}: {body}")),
            });
        }
        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    async fn signed_post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &str,
    ) -> Result<T, ExchangeError> {
        let body = self.signed_query(params);
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &str,
    ) -> Result<T, ExchangeError> {
        let query = self.signed_query(params);
        let resp = self
            .client
            .get(format!("{}{path}?{query}", self.base_url))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn signed_delete<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &str,
    ) -> Result<T, ExchangeError> {
        let query = self.signed_query(params);
        let resp = self
            .client
            .delete(format!("{}{path}?{query}", self.base_url))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Set leverage before an entry; a rejection here is logged, not fatal.
    async fn set_leverage(&self, symbol: &str, leverage: u32) {
        let params = format!("symbol={symbol}&leverage={leverage}");
        match self.signed_post::<Value>("/fapi/v1/leverage", &params).await {
            Ok(_) => info!("[BINANCE] leverage {symbol} -> {leverage}x"),
            Err(e) => warn!("[BINANCE] set_leverage {symbol} failed: {e}"),
        }
    }

    /// Submit one conditional reduceOnly leg, mapping rejection into a
    /// reportable outcome instead of an error.
    async fn submit_leg(&self, symbol: &str, params: String) -> LegResult {
        match self.signed_post::<OrderResponse>("/fapi/v1/order", &params).await {
            Ok(o) => LegResult::Placed { order_id: o.order_id.to_string() },
            Err(e) => {
                warn!("[BINANCE] {symbol} bracket leg rejected: {e}");
                LegResult::Rejected { reason: e.to_string() }
            }
        }
    }

    /// Signed net position amount across returned rows (one-way mode).
    async fn net_position_amt(&self, symbol: &str) -> Result<f64, ExchangeError> {
        let rows: Vec<Value> = self
            .signed_get("/fapi/v2/positionRisk", &format!("symbol={symbol}"))
            .await?;
        let mut size = 0.0;
        for row in &rows {
            size += row["positionAmt"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
        }
        Ok(size)
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Value>, ExchangeError> {
        self.signed_get("/fapi/v1/openOrders", &format!("symbol={symbol}"))
            .await
    }
}

/// Trim a quantity/price for the wire; Binance rejects long decimal tails.
fn fmt_f64(v: f64) -> String {
    let s = format!("{v:.8}");
    s.trim_end_matches('0').trim_end_matches('.').to_owned()
}

fn is_reduce_only(order: &Value) -> bool {
    order["reduceOnly"].as_bool().unwrap_or_else(|| {
        matches!(order["reduceOnly"].as_str(), Some("true") | Some("1"))
    })
}

#[async_trait]
impl ExchangeAdapter for BinanceUsdm {
    fn name(&self) -> &'static str {
        "binance-usdm"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={symbol}&interval={timeframe}&limit={limit}",
            self.base_url
        );
        let resp = self.client.get(&url).send().await?;
        let rows: Vec<Vec<Value>> = Self::decode(resp).await?;

        // kline rows mix integers and numeric strings:
        // [openTime, "open", "high", "low", "close", "volume", closeTime, ...]
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.len() < 6 {
                return Err(ExchangeError::Decode("short kline row".into()));
            }
            let num = |v: &Value| -> Result<f64, ExchangeError> {
                v.as_str()
                    .and_then(|s| s.parse::<f64>().ok())
                    .or_else(|| v.as_f64())
                    .ok_or_else(|| ExchangeError::Decode(format!("bad kline field: {v}")))
            };
            out.push(Kline {
                open_time: row[0]
                    .as_i64()
                    .ok_or_else(|| ExchangeError::Decode("bad kline open time".into()))?,
                open:   num(&row[1])?,
                high:   num(&row[2])?,
                low:    num(&row[3])?,
                close:  num(&row[4])?,
                volume: num(&row[5])?,
            });
        }
        Ok(out)
    }

    async fn open_market(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: f64,
        leverage: Option<u32>,
    ) -> Result<OrderReceipt, ExchangeError> {
        self.set_leverage(symbol, leverage.unwrap_or(self.default_leverage))
            .await;

        let params = format!(
            "symbol={symbol}&side={}&type=MARKET&quantity={}",
            side.order_side(),
            fmt_f64(qty)
        );
        info!("[BINANCE] {} {} {symbol} @ MARKET", side.order_side(), fmt_f64(qty));
        let order: OrderResponse = self.signed_post("/fapi/v1/order", &params).await?;
        info!("[BINANCE] order accepted: id={} status={}", order.order_id, order.status);
        Ok(OrderReceipt::Submitted { order_id: order.order_id.to_string() })
    }

    async fn close_all(&self, symbol: &str) -> Result<OrderReceipt, ExchangeError> {
        let amt = self.net_position_amt(symbol).await?;
        if amt == 0.0 {
            return Ok(OrderReceipt::NoPosition);
        }
        let side = if amt > 0.0 { "SELL" } else { "BUY" };
        let params = format!(
            "symbol={symbol}&side={side}&type=MARKET&quantity={}&reduceOnly=true",
            fmt_f64(amt.abs())
        );
        warn!("[BINANCE] closing position: {side} {symbol} qty={}", fmt_f64(amt.abs()));
        let order: OrderResponse = self.signed_post("/fapi/v1/order", &params).await?;
        Ok(OrderReceipt::Submitted { order_id: order.order_id.to_string() })
    }

    async fn place_bracket(&self, req: &BracketRequest) -> Result<BracketReport, ExchangeError> {
        let exit_side = req.side.exit_side();
        let base = format!(
            "symbol={}&side={exit_side}&quantity={}&reduceOnly=true&workingType={}&timeInForce=GTC",
            req.symbol,
            fmt_f64(req.qty),
            req.working_type.as_param()
        );

        let mut report = BracketReport::default();

        if let Some(sl) = req.sl_price {
            let params = format!("{base}&type=STOP_MARKET&stopPrice={}", fmt_f64(sl));
            report.sl = Some(self.submit_leg(&req.symbol, params).await);
        }
        if let Some(tp) = req.tp_price {
            let params = if req.tp_as_market {
                format!("{base}&type=TAKE_PROFIT_MARKET&stopPrice={}", fmt_f64(tp))
            } else {
                format!(
                    "{base}&type=TAKE_PROFIT&stopPrice={}&price={}",
                    fmt_f64(tp),
                    fmt_f64(tp)
                )
            };
            report.tp = Some(self.submit_leg(&req.symbol, params).await);
        }
        Ok(report)
    }

    async fn cancel_reduces_if_flat(&self, symbol: &str) -> Result<(), ExchangeError> {
        if self.net_position_amt(symbol).await? != 0.0 {
            return Ok(());
        }
        let orders = self.open_orders(symbol).await?;
        for order in &orders {
            if !is_reduce_only(order) {
                continue;
            }
            let Some(order_id) = order["orderId"].as_i64() else {
                continue;
            };
            let params = format!("symbol={symbol}&orderId={order_id}");
            if let Err(e) = self.signed_delete::<Value>("/fapi/v1/order", &params).await {
                // best-effort janitor: keep cancelling the rest
                warn!("[BINANCE] {symbol} cancel order {order_id} failed: {e}");
            }
        }
        Ok(())
    }

    async fn has_reduce_only(&self, symbol: &str) -> Result<bool, ExchangeError> {
        Ok(self.open_orders(symbol).await?.iter().any(is_reduce_only))
    }

    async fn get_position_detail(&self, symbol: &str) -> Result<PositionDetail, ExchangeError> {
        let rows: Vec<Value> = self
            .signed_get("/fapi/v2/positionRisk", &format!("symbol={symbol}"))
            .await?;

        let mut amt = 0.0;
        let mut entry = None;
        for row in &rows {
            amt += row["positionAmt"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
            if entry.is_none() {
                entry = row["entryPrice"]
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|p| *p > 0.0);
            }
        }
        let side = if amt > 0.0 {
            Some(PositionSide::Long)
        } else if amt < 0.0 {
            Some(PositionSide::Short)
        } else {
            None
        };
        Ok(PositionDetail { side, size: amt.abs(), entry_price: entry })
    }

    async fn get_equity(&self) -> Result<Option<f64>, ExchangeError> {
        let account: Value = self.signed_get("/fapi/v2/account", "").await?;
        Ok(account["totalMarginBalance"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok()))
    }

    async fn get_free_balance(&self) -> Result<Option<f64>, ExchangeError> {
        let balances: Vec<BalanceEntry> = self.signed_get("/fapi/v2/balance", "").await?;
        Ok(balances
            .iter()
            .find(|b| b.asset == "USDT")
            .and_then(|b| b.available_balance.parse::<f64>().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_f64_trims_trailing_zeros() {
        assert_eq!(fmt_f64(0.5000), "0.5");
        assert_eq!(fmt_f64(12.0), "12");
        assert_eq!(fmt_f64(0.00010000), "0.0001");
        assert_eq!(fmt_f64(0.123456789), "0.12345679");
    }

    #[test]
    fn reduce_only_flag_accepts_bool_and_string() {
        assert!(is_reduce_only(&serde_json::json!({"reduceOnly": true})));
        assert!(is_reduce_only(&serde_json::json!({"reduceOnly": "true"})));
        assert!(!is_reduce_only(&serde_json::json!({"reduceOnly": false})));
        assert!(!is_reduce_only(&serde_json::json!({})));
    }
}
