//! Exchange registry for the dollarbars trade downloader.
//!
//! The registry maps every supported exchange to its download profile. It is
//! an owned, immutable value: build it once and hand it to whatever needs it.
//!
//! # Example
//!
//! ```
//! use dollarbars_exchanges::ExchangeRegistry;
//! use dollarbars_types::ExchangeId;
//!
//! let registry = ExchangeRegistry::builtin();
//!
//! if let Some(profile) = registry.get(ExchangeId::Binance) {
//!     println!("{}: {} trades per page", profile.id(), profile.page_limit());
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod params;
mod profile;

use std::collections::BTreeMap;

use dollarbars_types::{DollarbarsError, ExchangeId};

pub use params::{FetchParams, FetchWindow, QueryParams, params_for};
pub use profile::{ExchangeProfile, FetchMode};

/// The exchange profile JSON embedded at compile time.
const EXCHANGES_JSON: &str = include_str!("../data/exchanges.json");

/// Registry of exchange download profiles.
#[derive(Debug, Clone)]
pub struct ExchangeRegistry {
    profiles: BTreeMap<ExchangeId, ExchangeProfile>,
}

impl ExchangeRegistry {
    /// Returns the built-in registry.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_json(EXCHANGES_JSON).expect("Invalid exchanges.json")
    }

    /// Parses a registry from a JSON array of profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let profiles: Vec<ExchangeProfile> = serde_json::from_str(json)?;
        Ok(Self::from_profiles(profiles))
    }

    /// Builds a registry from explicit profiles. Later duplicates win.
    #[must_use]
    pub fn from_profiles(profiles: impl IntoIterator<Item = ExchangeProfile>) -> Self {
        let profiles = profiles.into_iter().map(|p| (p.id(), p)).collect();
        Self { profiles }
    }

    /// Looks up a profile.
    #[must_use]
    pub fn get(&self, id: ExchangeId) -> Option<&ExchangeProfile> {
        self.profiles.get(&id)
    }

    /// Looks up a profile, failing for exchanges missing from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DollarbarsError::UnknownExchange`] if the exchange has no profile.
    pub fn require(&self, id: ExchangeId) -> Result<&ExchangeProfile, DollarbarsError> {
        self.get(id)
            .ok_or_else(|| DollarbarsError::UnknownExchange(id.to_string()))
    }

    /// Returns all profiles ordered by exchange.
    pub fn all(&self) -> impl Iterator<Item = &ExchangeProfile> {
        self.profiles.values()
    }

    /// Returns the number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
