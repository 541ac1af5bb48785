//! Trade and dollar bar persistence for dollarbars.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod memory;
mod sqlite;
mod store;
mod table;

#[cfg(test)]
mod test_support;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::{DATABASE_FILE, SqliteStore};
pub use store::TradeStore;
