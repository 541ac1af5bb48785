//! CLI command implementations.

pub(crate) mod bars;
pub(crate) mod download;
pub(crate) mod exchanges;
