//! Error types for geoprox.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GeoproxError>;

/// Errors reported by the index, the stores and the geohash providers.
///
/// Empty query results are never errors: aggregates return `None` and
/// collections come back empty.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoproxError {
    /// A precision above the resolution of the index or provider.
    #[error("precision {precision} exceeds resolution {resolution}")]
    InvalidPrecision { precision: usize, resolution: usize },

    /// A snapshot was requested past the end of the operation log.
    #[error("cannot replay {requested} operations, log holds {available}")]
    SnapshotOutOfRange { requested: usize, available: usize },

    /// The index cannot be allocated at this resolution.
    #[error("resolution {resolution} is above the supported maximum of {max} bits")]
    InvalidResolution { resolution: usize, max: usize },

    #[error("invalid geohash: {0}")]
    InvalidGeohash(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GeoproxError {
    pub(crate) fn check_precision(precision: usize, resolution: usize) -> Result<()> {
        if precision > resolution {
            return Err(Self::InvalidPrecision {
                precision,
                resolution,
            });
        }
        Ok(())
    }
}
