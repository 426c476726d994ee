//! Expense Ledger Bot
//!
//! Records short free-text messages ("100k cơm @vợ") as categorized
//! financial transactions and answers aggregate queries against a
//! partitioned tabular store.
//!
//! INGESTION PATH:
//! INBOUND TEXT → DEDUP GATE → PARSE → CLASSIFY → LEDGER APPEND → DAILY CACHE → REPLY
//!
//! The chat transport, chart rendering, file delivery and the scheduled-job
//! trigger are external collaborators; this crate maps events to replies.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod models;
pub mod parser;
pub mod reports;
pub mod scheduler;

pub use error::Result;

// Re-export common types
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use ledger::{InMemoryBackend, LedgerBackend, LedgerStore, RemoteBackend};
pub use models::*;
