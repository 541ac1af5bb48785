//! Bequant public trades (v3 API).

use async_trait::async_trait;
use dollarbars_types::{DollarbarsError, ExchangeId, RawTrade, Result, Side};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::{
    DownloadClient, ParseError, TradeSource,
    parse::{number_text, timestamp_from_rfc3339},
    source::concat_symbol,
    url::BEQUANT_API_URL,
};

/// Error code Bequant uses for request throttling.
const ERR_TOO_MANY_REQUESTS: i64 = 429;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TradesResponse {
    Trades(Vec<PublicTrade>),
    Error { error: ApiError },
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    message: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublicTrade {
    id: Value,
    price: String,
    qty: String,
    side: String,
    timestamp: String,
}

/// Parses a `public/trades/{symbol}` response body.
///
/// # Errors
///
/// Returns [`DollarbarsError::Network`] when throttled and
/// [`DollarbarsError::Protocol`] for any other error or malformed row.
pub fn parse_trades(body: &[u8]) -> Result<Vec<RawTrade>> {
    let entries = match serde_json::from_slice::<TradesResponse>(body).map_err(ParseError::from)? {
        TradesResponse::Trades(entries) => entries,
        TradesResponse::Error { error } => {
            let text = format!(
                "Bequant error {}: {} {}",
                error.code,
                error.message,
                error.description.unwrap_or_default()
            );
            return Err(if error.code == ERR_TOO_MANY_REQUESTS {
                DollarbarsError::Network(text)
            } else {
                DollarbarsError::Protocol(text)
            });
        }
    };

    entries
        .into_iter()
        .map(|entry| -> Result<RawTrade> {
            let id = number_text(&entry.id).ok_or_else(|| {
                DollarbarsError::Protocol(format!("Bequant trade has invalid id: {}", entry.id))
            })?;
            let side: Side = entry
                .side
                .parse()
                .map_err(|_| ParseError::InvalidSide(entry.side.clone()))?;
            Ok(RawTrade::new(
                timestamp_from_rfc3339(&entry.timestamp)?,
                id,
                side,
                entry.price,
                entry.qty,
            ))
        })
        .collect()
}

/// Trade source backed by Bequant's `public/trades/{symbol}` endpoint.
#[derive(Debug, Clone)]
pub struct BequantSource {
    client: DownloadClient,
    base_url: String,
}

impl BequantSource {
    /// Creates a source using the public endpoint.
    #[must_use]
    pub fn new(client: DownloadClient) -> Self {
        Self::with_base_url(client, BEQUANT_API_URL)
    }

    /// Creates a source against a custom API root.
    #[must_use]
    pub fn with_base_url(client: DownloadClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn trades_url(&self, symbol: &str) -> String {
        format!("{}/public/trades/{}", self.base_url, concat_symbol(symbol))
    }
}

#[async_trait]
impl TradeSource for BequantSource {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bequant
    }

    fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(100)
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        params: &[(String, String)],
    ) -> Result<Vec<RawTrade>> {
        let body = self.client.get(&self.trades_url(symbol), params).await?;
        parse_trades(&body)
    }
}
