/// webhook.rs — Signal-ingestion contract
///
/// The HTTP transport lives outside this crate; what is pinned down here is
/// the payload schema an inbound alert must carry and the auth policy the
/// transport must enforce before acting on one.
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::models::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    Open,
    Close,
}

/// One inbound trading command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCommand {
    pub action: WebhookAction,
    pub symbol: String,
    #[serde(default)]
    pub side: Option<PositionSide>,
    #[serde(default)]
    pub qty_usd: Option<f64>,
    #[serde(default)]
    pub leverage: Option<u32>,
}

/// Auth policy:
///   - an empty configured token allows everyone (local-only deployments)
///   - with the local bypass on, loopback/private peers are allowed
///   - otherwise the supplied shared secret must match exactly
pub fn authorize(
    configured_token: &str,
    supplied: Option<&str>,
    peer: Option<IpAddr>,
    allow_local: bool,
) -> bool {
    if configured_token.is_empty() {
        return true;
    }
    if allow_local && peer.is_some_and(is_private_addr) {
        return true;
    }
    supplied == Some(configured_token)
}

/// Loopback or RFC-1918 private address.
pub fn is_private_addr(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}
