//! Dollar bar aggregation for dollarbars.
//!
//! - [`DollarBarAggregator`] - buffers trades and emits closed buckets as bars
//! - [`BarGenerator`] - resumable run over a [`dollarbars_store::TradeStore`]
//! - [`run_aggregation`] - one run with the default settings

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod builder;
mod runner;

pub use aggregator::DollarBarAggregator;
pub use runner::{
    AggregateConfig, AggregateObserver, AggregationOutcome, AggregationState, BarGenerator,
    run_aggregation,
};
