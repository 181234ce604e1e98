/// ledger.rs — Ownership ledger ("bot tag" store)
///
/// Durable JSON table, keyed by symbol, recording which open positions this
/// bot created. The restore engine refuses to touch live positions without a
/// valid tag here — absence means "foreign/manual position".
///
/// Writes replace the whole table through a temp file + rename in the same
/// directory, so a concurrent reader (the restore watch task) never observes
/// a half-written file, even across stuttered restarts.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::PositionSide;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger json: {0}")]
    Json(#[from] serde_json::Error),
}

/// One ledger entry. Overwritten on every new bot-initiated entry for the
/// symbol; an expired entry is treated as absent on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTag {
    pub ts_created:    DateTime<Utc>,
    pub side:          PositionSide,
    pub qty:           f64,
    pub entry:         f64,
    pub sl:            Option<f64>,
    pub tp:            Option<f64>,
    pub stop_distance: f64,
}

impl PositionTag {
    pub fn expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.ts_created > ttl
    }
}

#[derive(Debug, Clone)]
pub struct TagStore {
    path: PathBuf,
    ttl:  Duration,
}

impl TagStore {
    pub fn new(path: impl Into<PathBuf>, ttl_hours: i64) -> Self {
        Self {
            path: path.into(),
            ttl:  Duration::hours(ttl_hours),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full table as stored, without TTL filtering.
    /// A missing file is an empty table, not an error.
    pub fn load_all(&self) -> Result<BTreeMap<String, PositionTag>, LedgerError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Valid (non-expired) tag for `symbol`, if any.
    pub fn get(&self, symbol: &str) -> Result<Option<PositionTag>, LedgerError> {
        let table = self.load_all()?;
        let now = Utc::now();
        Ok(table
            .get(symbol)
            .filter(|t| !t.expired(now, self.ttl))
            .cloned())
    }

    /// Insert or overwrite the tag for `symbol`, atomically replacing the
    /// file on disk.
    pub fn upsert(&self, symbol: &str, tag: PositionTag) -> Result<(), LedgerError> {
        let mut table = self.load_all().unwrap_or_else(|e| {
            warn!("[LEDGER] unreadable table at {}, starting fresh: {e}", self.path.display());
            BTreeMap::new()
        });
        table.insert(symbol.to_owned(), tag);
        self.write_atomic(&table)
    }

    /// External-cleanup path: drop the tag for `symbol` if present.
    pub fn remove(&self, symbol: &str) -> Result<(), LedgerError> {
        let mut table = self.load_all()?;
        if table.remove(symbol).is_some() {
            self.write_atomic(&table)?;
        }
        Ok(())
    }

    fn write_atomic(&self, table: &BTreeMap<String, PositionTag>) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(table)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = table.len(), "ledger written");
        Ok(())
    }
}
