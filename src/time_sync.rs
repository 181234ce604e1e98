/// time_sync.rs — Binance server-time offset
///
/// Signed requests carry a timestamp the server validates against its own
/// clock; a skewed local clock gets orders rejected. The offset is measured
/// once at adapter construction (midpoint of the round trip) and applied to
/// every subsequent timestamp.
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::exchange::ExchangeError;

#[derive(Deserialize)]
struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    server_time: i64,
}

#[derive(Debug, Default)]
pub struct TimeSync {
    offset_ms: i64,
}

impl TimeSync {
    pub fn new() -> Self {
        Self { offset_ms: 0 }
    }

    /// Measure the local-to-server clock offset.
    pub async fn sync(&mut self, client: &Client, base_url: &str) -> Result<(), ExchangeError> {
        let url = format!("{base_url}/fapi/v1/time");

        let local_before = Utc::now().timestamp_millis();
        let response: ServerTimeResponse = client.get(&url).send().await?.json().await?;
        let local_after = Utc::now().timestamp_millis();

        // offset = server_time − estimated local time at the response instant
        let round_trip = local_after - local_before;
        let estimated_local = local_before + round_trip / 2;
        self.offset_ms = response.server_time - estimated_local;

        info!("[TIME] sync offset {}ms", self.offset_ms);
        Ok(())
    }

    /// Server-synced Unix timestamp in milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        Utc::now().timestamp_millis() + self.offset_ms
    }
}
