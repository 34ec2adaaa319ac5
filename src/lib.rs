//! In-memory proximity database with geohash prefix queries, attribute
//! aggregates and operation-log time travel.
//!
//! Positions are indexed by the bits of their geohash in a flat array of
//! `2^resolution` slots. "Nearby" means "shares the first `k` geohash bits",
//! which the array answers with a single contiguous slice for any `k`.
//!
//! ```rust
//! use geoprox::{AttributeTable, DBBuilder, Position};
//!
//! #[derive(Clone)]
//! struct Cafe {
//!     name: &'static str,
//!     rating: f64,
//! }
//!
//! let attributes = AttributeTable::new()
//!     .with("name", |c: &Cafe| Some(c.name.into()))
//!     .with("rating", |c: &Cafe| Some(c.rating.into()));
//!
//! let mut db = DBBuilder::new().resolution(16).build_stream(attributes)?;
//! db.insert(Position::new(40.7128, -74.0060), Cafe { name: "Gotham", rating: 4.5 })?;
//! db.insert(Position::new(40.7130, -74.0062), Cafe { name: "Hudson", rating: 3.5 })?;
//!
//! let here = Position::new(40.7129, -74.0061);
//! assert_eq!(db.average_nearby("rating", &here, 14)?, Some(4.0));
//!
//! // Rebuild the store as it was after the first insert.
//! let earlier = db.database_state_at_time(1)?;
//! assert_eq!(earlier.count_nearby("name", &here, 14)?, 1);
//! # Ok::<(), geoprox::GeoproxError>(())
//! ```

pub mod attributes;
pub mod builder;
pub mod config;
pub mod db;
pub mod error;
pub mod geohash;
pub mod index;
pub mod types;

pub use attributes::{AttributeStrategy, AttributeTable, AttributeValue, JsonAttributes, MapAttributes};
pub use builder::DBBuilder;
pub use config::Config;
pub use db::{OpRecord, Operation, OperationLog, ProximityDB, StreamDB};
pub use error::{GeoproxError, Result};
pub use geohash::{Base32Geohash, Direction, GeoHash, GeohashProvider, GeohashTable};
pub use index::{MAX_RESOLUTION, PrecisionIndex, SlotContainer};
pub use types::{DbStats, Entry, Position};

#[cfg(feature = "sync")]
pub use db::SyncStreamDB;

pub use geo::Point;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{
        AttributeStrategy, AttributeTable, AttributeValue, Base32Geohash, Config, DBBuilder,
        GeoHash, GeohashProvider, GeoproxError, Position, ProximityDB, Result, StreamDB,
    };

    #[cfg(feature = "sync")]
    pub use crate::SyncStreamDB;

    pub use geo::Point;
}
