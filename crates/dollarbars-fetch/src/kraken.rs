//! Kraken public trades.

use async_trait::async_trait;
use dollarbars_types::{DollarbarsError, ExchangeId, RawTrade, Result, Side};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::{
    DownloadClient, ParseError, TradeSource,
    parse::{number_text, timestamp_from_seconds},
    url::KRAKEN_TRADES_URL,
};

#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: BTreeMap<String, Value>,
}

/// Converts a unified symbol to Kraken's pair name (`BTC/USD` to `XBTUSD`).
#[must_use]
pub fn kraken_pair(symbol: &str) -> String {
    symbol
        .split('/')
        .map(|asset| match asset.to_uppercase().as_str() {
            "BTC" => "XBT".to_string(),
            "DOGE" => "XDG".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn invalid(what: &str, row: &Value) -> DollarbarsError {
    DollarbarsError::Protocol(format!("Kraken trade has invalid {what}: {row}"))
}

fn classify_errors(errors: &[String]) -> DollarbarsError {
    let message = errors.join(", ");
    let transient = errors.iter().any(|e| {
        e.starts_with("EAPI:Rate limit")
            || e.starts_with("EService:Unavailable")
            || e.starts_with("EService:Busy")
            || e.starts_with("EGeneral:Temporary")
    });
    if transient {
        DollarbarsError::Network(message)
    } else {
        DollarbarsError::Protocol(message)
    }
}

/// Parses a `Trades` response body.
///
/// Rows are `[price, volume, time, side, type, misc, trade_id]`. The `last`
/// cursor of the response is attached to the final trade.
///
/// # Errors
///
/// Returns [`DollarbarsError::Network`] for throttling errors reported in the
/// body and [`DollarbarsError::Protocol`] for any other error or malformed row.
pub fn parse_trades(body: &[u8]) -> Result<Vec<RawTrade>> {
    let response: TradesResponse = serde_json::from_slice(body).map_err(ParseError::from)?;
    if !response.error.is_empty() {
        return Err(classify_errors(&response.error));
    }

    let last = response.result.get("last").and_then(number_text);
    let rows = response
        .result
        .iter()
        .find(|(key, _)| key.as_str() != "last")
        .and_then(|(_, value)| value.as_array())
        .cloned()
        .unwrap_or_default();

    let mut trades = Vec::with_capacity(rows.len());
    for row in &rows {
        let fields = row.as_array().ok_or_else(|| invalid("shape", row))?;
        let price = fields.first().and_then(number_text).ok_or_else(|| invalid("price", row))?;
        let amount = fields.get(1).and_then(number_text).ok_or_else(|| invalid("volume", row))?;
        let time = fields.get(2).and_then(number_text).ok_or_else(|| invalid("time", row))?;
        let side: Side = fields
            .get(3)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid("side", row))?;
        // Older rows carry no trade id, the timestamp is the best stable key then.
        let id = fields.get(6).and_then(number_text).unwrap_or_else(|| time.clone());

        trades.push(RawTrade::new(timestamp_from_seconds(&time)?, id, side, price, amount));
    }

    if let (Some(last), Some(trade)) = (last, trades.last_mut()) {
        trade.cursor = Some(last);
    }
    Ok(trades)
}

/// Trade source backed by Kraken's `Trades` endpoint.
#[derive(Debug, Clone)]
pub struct KrakenSource {
    client: DownloadClient,
    base_url: String,
}

impl KrakenSource {
    /// Creates a source using the public endpoint.
    #[must_use]
    pub fn new(client: DownloadClient) -> Self {
        Self::with_base_url(client, KRAKEN_TRADES_URL)
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
impl TradeSource for KrakenSource {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Kraken
    }

    fn min_request_spacing(&self) -> Duration {
        Duration::from_secs(3)
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        params: &[(String, String)],
    ) -> Result<Vec<RawTrade>> {
        let mut query = Vec::with_capacity(params.len() + 1);
        query.push(("pair".to_string(), kraken_pair(symbol)));
        query.extend_from_slice(params);

        let body = self.client.get(&self.base_url, &query).await?;
        parse_trades(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kraken_pair() {
        assert_eq!(kraken_pair("BTC/USD"), "XBTUSD");
        assert_eq!(kraken_pair("eth/eur"), "ETHEUR");
        assert_eq!(kraken_pair("XBTUSD"), "XBTUSD");
    }

    #[test]
    fn test_parse_trades() {
        let body = br#"{"error":[],"result":{"XXBTZUSD":[
            ["6650.50000","0.25000000",1585180700.0647,"b","l","",1001],
            ["6650.40000","1.00000000",1585180701.5,"s","m","",1002]
        ],"last":"1585180701500000000"}}"#;

        let trades = parse_trades(body).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, "1001");
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].price, "6650.50000");
        assert_eq!(trades[0].cursor, None);
        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].cursor.as_deref(), Some("1585180701500000000"));
    }

    #[test]
    fn test_parse_trades_empty_page_keeps_no_cursor() {
        let body = br#"{"error":[],"result":{"XXBTZUSD":[],"last":"1"}}"#;
        assert!(parse_trades(body).unwrap().is_empty());
    }

    #[test]
    fn test_error_classification() {
        let throttled = br#"{"error":["EAPI:Rate limit exceeded"]}"#;
        assert!(parse_trades(throttled).unwrap_err().is_transient());

        let unknown = br#"{"error":["EQuery:Unknown asset pair"]}"#;
        assert!(parse_trades(unknown).unwrap_err().is_protocol());
    }
}
