//! Bitfinex v2 public trades.

use async_trait::async_trait;
use dollarbars_types::{DollarbarsError, ExchangeId, RawTrade, Result, Side};
use serde_json::Value;
use std::time::Duration;

use crate::{
    DownloadClient, ParseError, TradeSource,
    parse::{number_text, timestamp_from_millis},
    url::BITFINEX_API_URL,
};

/// Bitfinex error code for request throttling.
const ERR_RATE_LIMIT: i64 = 11010;

/// Converts a unified symbol to Bitfinex's trading pair (`BTC/USDT` to `tBTCUST`).
///
/// Pairs with an asset longer than three letters use the `tBASE:QUOTE` form.
#[must_use]
pub fn bitfinex_symbol(symbol: &str) -> String {
    let assets: Vec<String> = symbol
        .split('/')
        .map(|asset| match asset.to_uppercase().as_str() {
            "USDT" => "UST".to_string(),
            other => other.to_string(),
        })
        .collect();
    match assets.as_slice() {
        [base, quote] if base.len() != 3 || quote.len() != 3 => format!("t{base}:{quote}"),
        _ => format!("t{}", assets.concat()),
    }
}

fn invalid(what: &str, row: &Value) -> DollarbarsError {
    DollarbarsError::Protocol(format!("Bitfinex trade has invalid {what}: {row}"))
}

/// Error payloads are `["error", code, message]` or `{"error": "..."}`.
fn error_of(value: &Value) -> Option<DollarbarsError> {
    match value {
        Value::Array(fields) if fields.first().and_then(Value::as_str) == Some("error") => {
            let code = fields.get(1).and_then(Value::as_i64).unwrap_or_default();
            let message = fields.get(2).and_then(Value::as_str).unwrap_or_default();
            let text = format!("Bitfinex error {code}: {message}");
            Some(if code == ERR_RATE_LIMIT {
                DollarbarsError::Network(text)
            } else {
                DollarbarsError::Protocol(text)
            })
        }
        Value::Object(map) => {
            let message = map.get("error").map(Value::to_string).unwrap_or_else(|| value.to_string());
            Some(if message.contains("RATE_LIMIT") {
                DollarbarsError::Network(message)
            } else {
                DollarbarsError::Protocol(message)
            })
        }
        _ => None,
    }
}

/// Parses a `trades/{symbol}/hist` response body.
///
/// Rows are `[id, mts, amount, price]`; a negative amount is a sell.
///
/// # Errors
///
/// Returns [`DollarbarsError::Network`] when throttled and
/// [`DollarbarsError::Protocol`] for any other error or malformed row.
pub fn parse_trades(body: &[u8]) -> Result<Vec<RawTrade>> {
    let response: Value = serde_json::from_slice(body).map_err(ParseError::from)?;
    if let Some(err) = error_of(&response) {
        return Err(err);
    }
    let rows = response.as_array().ok_or_else(|| invalid("shape", &response))?;

    rows.iter()
        .map(|row| -> Result<RawTrade> {
            let fields = row.as_array().ok_or_else(|| invalid("shape", row))?;
            let id = fields.first().and_then(number_text).ok_or_else(|| invalid("id", row))?;
            let mts = fields.get(1).and_then(Value::as_i64).ok_or_else(|| invalid("time", row))?;
            let amount = fields.get(2).and_then(number_text).ok_or_else(|| invalid("amount", row))?;
            let price = fields.get(3).and_then(number_text).ok_or_else(|| invalid("price", row))?;

            let (side, amount) = match amount.strip_prefix('-') {
                Some(abs) => (Side::Sell, abs.to_string()),
                None => (Side::Buy, amount),
            };
            Ok(RawTrade::new(timestamp_from_millis(mts)?, id, side, price, amount))
        })
        .collect()
}

/// Trade source backed by Bitfinex's `trades/{symbol}/hist` endpoint.
#[derive(Debug, Clone)]
pub struct BitfinexSource {
    client: DownloadClient,
    base_url: String,
}

impl BitfinexSource {
    /// Creates a source using the public endpoint.
    #[must_use]
    pub fn new(client: DownloadClient) -> Self {
        Self::with_base_url(client, BITFINEX_API_URL)
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
        format!("{}/trades/{}/hist", self.base_url, bitfinex_symbol(symbol))
    }
}

#[async_trait]
impl TradeSource for BitfinexSource {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bitfinex2
    }

    fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(1_500)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitfinex_symbol() {
        assert_eq!(bitfinex_symbol("BTC/USD"), "tBTCUSD");
        assert_eq!(bitfinex_symbol("btc/usdt"), "tBTCUST");
        assert_eq!(bitfinex_symbol("LUNA/USD"), "tLUNA:USD");
        assert_eq!(bitfinex_symbol("BTCUSD"), "tBTCUSD");
    }

    #[test]
    fn test_trades_url() {
        let source = BitfinexSource::new(DownloadClient::with_defaults().unwrap());
        assert_eq!(
            source.trades_url("ETH/USD"),
            "https://api-pub.bitfinex.com/v2/trades/tETHUSD/hist"
        );
    }

    #[test]
    fn test_parse_trades() {
        let body = br#"[
            [388925127,1574694245478,0.005,7245.3],
            [388925128,1574694245500,-1e-8,7245.2]
        ]"#;

        let trades = parse_trades(body).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, "388925127");
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].amount, "0.005");
        assert_eq!(trades[0].price, "7245.3");
        assert_eq!(trades[0].timestamp.timestamp_millis(), 1_574_694_245_478);

        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].amount, "0.00000001");
    }

    #[test]
    fn test_error_classification() {
        let throttled = br#"["error",11010,"ratelimit: error"]"#;
        assert!(parse_trades(throttled).unwrap_err().is_transient());

        let bad_symbol = br#"["error",10020,"symbol: invalid"]"#;
        assert!(parse_trades(bad_symbol).unwrap_err().is_protocol());

        let limited = br#"{"error":"ERR_RATE_LIMIT"}"#;
        assert!(parse_trades(limited).unwrap_err().is_transient());
    }
}
