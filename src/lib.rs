pub mod bracket;
pub mod config;
pub mod exchange;
pub mod indicators;
pub mod ledger;
pub mod models;
pub mod restore;
pub mod runtime;
pub mod sizing;
pub mod strategy;
pub mod time_sync;
pub mod webhook;

pub use models::*;
