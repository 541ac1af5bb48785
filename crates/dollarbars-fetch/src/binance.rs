//! Binance aggregated trades.

use async_trait::async_trait;
use dollarbars_types::{ExchangeId, RawTrade, Result, Side};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    DownloadClient, ParseError, TradeSource, parse::timestamp_from_millis, source::concat_symbol,
    url::BINANCE_AGG_TRADES_URL,
};

/// One entry of the `aggTrades` response.
#[derive(Debug, Deserialize)]
struct AggTrade {
    #[serde(rename = "a")]
    id: u64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    time_ms: i64,
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

/// Parses an `aggTrades` response body.
///
/// # Errors
///
/// Returns an error if the body is not the expected JSON array.
pub fn parse_agg_trades(body: &[u8]) -> std::result::Result<Vec<RawTrade>, ParseError> {
    let entries: Vec<AggTrade> = serde_json::from_slice(body)?;
    entries
        .into_iter()
        .map(|entry| {
            // Maker on the bid means the taker sold.
            let side = if entry.buyer_is_maker { Side::Sell } else { Side::Buy };
            Ok(RawTrade::new(
                timestamp_from_millis(entry.time_ms)?,
                entry.id.to_string(),
                side,
                entry.price,
                entry.quantity,
            ))
        })
        .collect()
}

/// Trade source backed by Binance's `aggTrades` endpoint.
#[derive(Debug, Clone)]
pub struct BinanceSource {
    client: DownloadClient,
    base_url: String,
}

impl BinanceSource {
    /// Creates a source using the public endpoint.
    #[must_use]
    pub fn new(client: DownloadClient) -> Self {
        Self::with_base_url(client, BINANCE_AGG_TRADES_URL)
    }

    /// Creates a source against a custom endpoint.
    #[must_use]
    pub fn with_base_url(client: DownloadClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TradeSource for BinanceSource {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(50)
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        params: &[(String, String)],
    ) -> Result<Vec<RawTrade>> {
        let mut query = Vec::with_capacity(params.len() + 1);
        query.push(("symbol".to_string(), concat_symbol(symbol)));
        query.extend_from_slice(params);

        let body = self.client.get(&self.base_url, &query).await?;
        Ok(parse_agg_trades(&body)?)
    }
}
