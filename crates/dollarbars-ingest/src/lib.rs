//! Adaptive, resumable trade ingestion for dollarbars.
//!
//! - [`IngestController`] - resumes from the store and drives one run
//! - [`AdaptiveWindow`] - request window sized to the tape's density
//! - [`BatchNormalizer`] - exact decimals and running notional sums

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod controller;
mod normalize;
mod progress;
mod window;

pub use config::{Clock, FixedClock, IngestConfig, SystemClock};
pub use controller::{Feed, IngestController, run_ingestion};
pub use normalize::{BatchNormalizer, SortOrder};
pub use progress::{IngestObserver, IngestProgress, IngestSummary};
pub use window::{AdaptiveWindow, PageFill};
