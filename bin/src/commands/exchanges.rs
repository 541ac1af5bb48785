//! Exchanges command implementation.
//!
//! This module lists the exchanges of the built-in registry.

use anyhow::Result;
use dollarbars_lib::FetchMode;
use dollarbars_lib::prelude::*;

use super::download::source_endpoint;

/// List the built-in exchange profiles.
pub(crate) fn list_exchanges() -> Result<()> {
    let registry = ExchangeRegistry::builtin();

    println!(
        "{:<12} {:<10} {:>10} {:>14} {:>8}  {:<18}",
        "ID", "MODE", "PAGE", "MAX WINDOW", "RATE", "SOURCE"
    );
    println!("{}", "-".repeat(78));

    for profile in registry.all() {
        let mode = match profile.fetch_mode() {
            FetchMode::Windowed => "windowed",
            FetchMode::Cursor => "cursor",
            FetchMode::DailySnapshot => "snapshot",
        };
        let window = match profile.fetch_mode() {
            FetchMode::Windowed => format!("{}s", profile.max_window_ns() / 1_000_000_000),
            _ => "-".to_string(),
        };
        println!(
            "{:<12} {:<10} {:>10} {:>14} {:>8}  {:<18}",
            profile.id().as_str(),
            mode,
            profile.page_limit(),
            window,
            format!("x{}", profile.rate_limit_multiplier()),
            source_endpoint(profile.id()),
        );
    }

    println!("\nTotal: {} exchanges", registry.len());
    Ok(())
}
