//! Bybit daily trade snapshots.

use async_trait::async_trait;
use chrono::NaiveDate;
use dollarbars_types::{DollarbarsError, ExchangeId, RawTrade, Result};
use tracing::debug;

use crate::{
    DownloadClient, SnapshotSource, decompress_gzip, parse_snapshot, source::concat_symbol,
    url::snapshot_url,
};

/// Snapshot source backed by `public.bybit.com`.
#[derive(Debug, Clone)]
pub struct BybitSnapshotSource {
    client: DownloadClient,
}

impl BybitSnapshotSource {
    /// Creates a new snapshot source.
    #[must_use]
    pub const fn new(client: DownloadClient) -> Self {
        Self { client }
    }
}

/// Decodes a compressed snapshot file into trades ordered by timestamp.
///
/// Trade ids in these files are UUIDs, so the timestamp is the only usable
/// order. The sort is stable and keeps file order among equal timestamps.
///
/// # Errors
///
/// Returns an error if the file cannot be decompressed or parsed.
pub async fn decode_snapshot(compressed: Vec<u8>) -> Result<Vec<RawTrade>> {
    let data = tokio::task::spawn_blocking(move || decompress_gzip(&compressed))
        .await
        .map_err(|e| DollarbarsError::Protocol(format!("decompression task failed: {e}")))??;

    let mut trades = parse_snapshot(&data).await?;
    trades.sort_by_key(|trade| trade.timestamp);
    Ok(trades)
}

#[async_trait]
impl SnapshotSource for BybitSnapshotSource {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    async fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<Option<Vec<RawTrade>>> {
        let url = snapshot_url(&concat_symbol(symbol), day);
        debug!(%url, "fetching snapshot");

        match self.client.download(&url).await? {
            Some(body) => decode_snapshot(body.to_vec()).await.map(Some),
            None => {
                debug!(%url, "no snapshot file");
                Ok(None)
            }
        }
    }
}
