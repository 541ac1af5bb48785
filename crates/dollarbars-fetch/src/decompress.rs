//! Gzip decompression for snapshot files.

use flate2::read::MultiGzDecoder;
use std::io::Read;
use thiserror::Error;

/// Errors that can occur during decompression.
#[derive(Error, Debug)]
pub enum DecompressError {
    /// Gzip stream was corrupt or truncated.
    #[error("Gzip decompression failed: {0}")]
    Gzip(#[from] std::io::Error),

    /// Empty input data.
    #[error("Empty input data")]
    EmptyInput,
}

impl From<DecompressError> for dollarbars_types::DollarbarsError {
    fn from(err: DecompressError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Decompresses a gzip file, including multi-member archives.
///
/// # Errors
///
/// Returns an error if the input is empty or not valid gzip.
pub fn decompress_gzip(compressed: &[u8]) -> Result<Vec<u8>, DecompressError> {
    if compressed.is_empty() {
        return Err(DecompressError::EmptyInput);
    }

    let mut decompressed = Vec::with_capacity(compressed.len() * 4);
    MultiGzDecoder::new(compressed).read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
