//! Poloniex public trade history.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use dollarbars_types::{DollarbarsError, ExchangeId, RawTrade, Result, Side};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::{DownloadClient, ParseError, TradeSource, parse::number_text, url::POLONIEX_PUBLIC_URL};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    Trades(Vec<HistoryTrade>),
    Error { error: String },
}

/// One entry of `returnTradeHistory`.
#[derive(Debug, Deserialize)]
struct HistoryTrade {
    #[serde(rename = "tradeID")]
    trade_id: Value,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    date: String,
    #[serde(rename = "type")]
    side: String,
    rate: String,
    amount: String,
}

/// Converts a unified symbol to Poloniex's currency pair (`BTC/USDT` to `USDT_BTC`).
#[must_use]
pub fn poloniex_pair(symbol: &str) -> String {
    match symbol.split_once('/') {
        Some((base, quote)) => format!("{}_{}", quote.to_uppercase(), base.to_uppercase()),
        None => symbol.to_uppercase(),
    }
}

fn parse_date(text: &str) -> std::result::Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::InvalidTimestamp(text.to_string()))
}

/// Parses a `returnTradeHistory` response body.
///
/// The endpoint returns newest trades first; order is restored during
/// normalization.
///
/// # Errors
///
/// Returns [`DollarbarsError::Protocol`] for an error object or a malformed row.
pub fn parse_trade_history(body: &[u8]) -> Result<Vec<RawTrade>> {
    let entries = match serde_json::from_slice::<HistoryResponse>(body).map_err(ParseError::from)? {
        HistoryResponse::Trades(entries) => entries,
        HistoryResponse::Error { error } => {
            return Err(DollarbarsError::Protocol(format!("Poloniex: {error}")));
        }
    };

    entries
        .into_iter()
        .map(|entry| -> Result<RawTrade> {
            let id = number_text(&entry.trade_id).ok_or_else(|| {
                DollarbarsError::Protocol(format!("Poloniex trade has invalid id: {}", entry.trade_id))
            })?;
            let side: Side = entry
                .side
                .parse()
                .map_err(|_| ParseError::InvalidSide(entry.side.clone()))?;
            Ok(RawTrade::new(parse_date(&entry.date)?, id, side, entry.rate, entry.amount))
        })
        .collect()
}

/// Trade source backed by Poloniex's `returnTradeHistory` command.
#[derive(Debug, Clone)]
pub struct PoloniexSource {
    client: DownloadClient,
    base_url: String,
}

impl PoloniexSource {
    /// Creates a source using the public endpoint.
    #[must_use]
    pub fn new(client: DownloadClient) -> Self {
        Self::with_base_url(client, POLONIEX_PUBLIC_URL)
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
impl TradeSource for PoloniexSource {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Poloniex
    }

    fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(170)
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        params: &[(String, String)],
    ) -> Result<Vec<RawTrade>> {
        let mut query = Vec::with_capacity(params.len() + 2);
        query.push(("command".to_string(), "returnTradeHistory".to_string()));
        query.push(("currencyPair".to_string(), poloniex_pair(symbol)));
        query.extend_from_slice(params);

        let body = self.client.get(&self.base_url, &query).await?;
        parse_trade_history(&body)
    }
}
