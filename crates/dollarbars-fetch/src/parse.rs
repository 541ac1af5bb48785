//! Timestamp and number helpers, and Bybit snapshot CSV parsing.

use chrono::{DateTime, Utc};
use dollarbars_types::{RawTrade, Side};
use futures::StreamExt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while parsing exchange payloads.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timestamp outside the representable range or not numeric.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Unknown trade side.
    #[error("Invalid side: {0}")]
    InvalidSide(String),
}

impl From<ParseError> for dollarbars_types::DollarbarsError {
    fn from(err: ParseError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Converts epoch milliseconds to a UTC timestamp.
///
/// # Errors
///
/// Returns an error if the value is out of range.
pub fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>, ParseError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| ParseError::InvalidTimestamp(ms.to_string()))
}

/// Converts decimal epoch seconds (`"1585180700.0647"`) to a UTC timestamp,
/// truncated to whole microseconds.
///
/// # Errors
///
/// Returns an error if the text is not a decimal number or is out of range.
pub fn timestamp_from_seconds(text: &str) -> Result<DateTime<Utc>, ParseError> {
    let seconds: Decimal = text
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(text.to_string()))?;
    let micros = (seconds * Decimal::from(1_000_000))
        .trunc()
        .to_i64()
        .ok_or_else(|| ParseError::InvalidTimestamp(text.to_string()))?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| ParseError::InvalidTimestamp(text.to_string()))
}

/// Parses an RFC 3339 timestamp (`2021-01-01T00:00:00.123Z`).
///
/// # Errors
///
/// Returns an error if the text is not RFC 3339.
pub fn timestamp_from_rfc3339(text: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ParseError::InvalidTimestamp(text.to_string()))
}

/// Returns the decimal text of a JSON string or number.
///
/// Numbers printed in exponent form (`1e-8`) are rewritten as plain decimals
/// so that downstream decimal parsing accepts them.
pub(crate) fn number_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text).ok().map(|d| d.normalize().to_string())
    } else {
        Some(text)
    }
}

/// One row of a Bybit daily trade snapshot.
///
/// Columns: `timestamp,symbol,side,size,price,tickDirection,trdMatchID,
/// grossValue,homeNotional,foreignNotional`.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRow {
    /// Epoch seconds with fractional part.
    pub timestamp: String,
    /// Exchange symbol.
    pub symbol: String,
    /// `Buy` or `Sell`.
    pub side: String,
    /// Price.
    pub price: String,
    /// Trade match identifier (UUID).
    #[serde(rename = "trdMatchID")]
    pub trd_match_id: String,
    /// Quantity in base-asset units.
    #[serde(rename = "homeNotional")]
    pub home_notional: String,
    /// Quantity in quote-currency units.
    #[serde(rename = "foreignNotional")]
    pub foreign_notional: String,
}

impl SnapshotRow {
    /// Converts the row into a raw trade. The amount is the base-asset quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp or side cannot be parsed.
    pub fn into_raw_trade(self) -> Result<RawTrade, ParseError> {
        let timestamp = timestamp_from_seconds(&self.timestamp)?;
        let side: Side = self
            .side
            .parse()
            .map_err(|_| ParseError::InvalidSide(self.side.clone()))?;
        Ok(RawTrade::new(
            timestamp,
            self.trd_match_id,
            side,
            self.price,
            self.home_notional,
        )
        .with_liquidation(false))
    }
}

/// Parses a decompressed Bybit snapshot into raw trades, in file order.
///
/// # Errors
///
/// Returns an error on malformed CSV or invalid fields.
pub async fn parse_snapshot(data: &[u8]) -> Result<Vec<RawTrade>, ParseError> {
    let mut reader = csv_async::AsyncReaderBuilder::new()
        .has_headers(true)
        .create_deserializer(data);
    let mut records = reader.deserialize::<SnapshotRow>();

    let mut trades = Vec::new();
    while let Some(row) = records.next().await {
        trades.push(row?.into_raw_trade()?);
    }
    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    const SNAPSHOT: &str = "timestamp,symbol,side,size,price,tickDirection,trdMatchID,grossValue,homeNotional,foreignNotional\n\
1585180700.0647,BTCUSDT,Buy,0.5,6650.5,ZeroPlusTick,8a9f3c1e-0000-4000-8000-000000000001,3.3e+11,0.5,3325.25\n\
1585180701,BTCUSDT,Sell,1.25,6650,MinusTick,8a9f3c1e-0000-4000-8000-000000000002,8.3e+11,1.25,8312.5\n";

    #[test]
    fn test_timestamp_from_millis() {
        let ts = timestamp_from_millis(1_609_459_200_123).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + chrono::TimeDelta::milliseconds(123));
    }

    #[test]
    fn test_timestamp_from_seconds_exact_micros() {
        let ts = timestamp_from_seconds("1585180700.0647").unwrap();
        assert_eq!(ts.timestamp(), 1_585_180_700);
        assert_eq!(ts.nanosecond(), 64_700_000);

        let truncated = timestamp_from_seconds("1688669597.82773691").unwrap();
        assert_eq!(truncated.nanosecond(), 827_736_000);
    }

    #[test]
    fn test_timestamp_from_rfc3339() {
        let ts = timestamp_from_rfc3339("2021-01-01T00:00:00.123Z").unwrap();
        assert_eq!(ts.timestamp_millis(), 1_609_459_200_123);
        assert!(timestamp_from_rfc3339("2021-01-01 00:00:00").is_err());
    }

    #[test]
    fn test_number_text() {
        assert_eq!(number_text(&serde_json::json!("0.10")).as_deref(), Some("0.10"));
        assert_eq!(number_text(&serde_json::json!(6650.5)).as_deref(), Some("6650.5"));
        assert_eq!(number_text(&serde_json::json!(1e-8)).as_deref(), Some("0.00000001"));
        assert_eq!(number_text(&serde_json::json!(-2.5)).as_deref(), Some("-2.5"));
        assert_eq!(number_text(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_timestamp_from_seconds_rejects_garbage() {
        assert!(matches!(
            timestamp_from_seconds("yesterday"),
            Err(ParseError::InvalidTimestamp(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_snapshot() {
        let trades = parse_snapshot(SNAPSHOT.as_bytes()).await.unwrap();
        assert_eq!(trades.len(), 2);

        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].price, "6650.5");
        assert_eq!(trades[0].amount, "0.5");
        assert_eq!(trades[0].liquidation, Some(false));
        assert_eq!(trades[0].id, "8a9f3c1e-0000-4000-8000-000000000001");

        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].timestamp.timestamp(), 1_585_180_701);
    }

    #[tokio::test]
    async fn test_parse_snapshot_bad_side() {
        let data = SNAPSHOT.replace("Sell", "Hold");
        assert!(matches!(
            parse_snapshot(data.as_bytes()).await,
            Err(ParseError::InvalidSide(_))
        ));
    }
}
