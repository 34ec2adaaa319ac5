//! Database builder
//!
//! Assembles a [`ProximityDB`] or [`StreamDB`] from a [`Config`] and an
//! optional custom geohash provider. Without a provider the builder uses
//! [`Base32Geohash`] with the configured clamping behavior.

use crate::attributes::AttributeStrategy;
use crate::config::Config;
use crate::db::{ProximityDB, StreamDB};
use crate::error::Result;
use crate::geohash::{Base32Geohash, GeohashProvider};
use std::fmt;
use std::sync::Arc;

/// Builder for databases with a validated configuration.
///
/// # Examples
///
/// ```rust
/// use geoprox::{DBBuilder, JsonAttributes, Position};
/// use serde_json::json;
///
/// # fn main() -> Result<(), geoprox::GeoproxError> {
/// let mut db = DBBuilder::new().resolution(12).build_stream(JsonAttributes)?;
/// db.insert(Position::new(48.8584, 2.2945), json!({ "visitors": 7_000_000 }))?;
///
/// assert_eq!(db.resolution(), 12);
/// assert_eq!(db.sum_nearby("visitors", &Position::new(48.8606, 2.3376), 8)?, Some(7_000_000.0));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DBBuilder {
    config: Config,
    provider: Option<Arc<dyn GeohashProvider>>,
}

impl DBBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            provider: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn resolution(mut self, resolution: usize) -> Self {
        self.config.resolution = resolution;
        self
    }

    /// Use `provider` instead of the default base32 encoder. The
    /// `clamp_coordinates` setting no longer applies.
    pub fn provider<P>(mut self, provider: P) -> Self
    where
        P: GeohashProvider + 'static,
    {
        self.provider = Some(Arc::new(provider));
        self
    }

    fn resolve_provider(&self) -> Arc<dyn GeohashProvider> {
        match &self.provider {
            Some(provider) => Arc::clone(provider),
            None => Arc::new(Base32Geohash::new(self.config.clamp_coordinates)),
        }
    }

    /// Build an empty proximity database.
    pub fn build<T>(self) -> Result<ProximityDB<T>> {
        self.config.check()?;
        ProximityDB::from_parts(self.resolve_provider(), self.config.resolution, Vec::new)
    }

    /// Build an empty streaming database reading attributes through
    /// `strategy`.
    pub fn build_stream<T, S>(self, strategy: S) -> Result<StreamDB<T>>
    where
        S: AttributeStrategy<T> + 'static,
    {
        let db = self.build()?;
        Ok(StreamDB::from_parts(db, Arc::new(strategy)))
    }
}

impl Default for DBBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DBBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DBBuilder")
            .field("config", &self.config)
            .field("custom_provider", &self.provider.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeValue, MapAttributes};
    use crate::error::GeoproxError;
    use crate::geohash::{GeoHash, GeohashTable};
    use crate::types::Position;
    use std::collections::HashMap;

    #[test]
    fn test_builder_default() {
        let builder = DBBuilder::new();
        assert_eq!(builder.config, Config::default());
        assert!(builder.provider.is_none());

        let db: ProximityDB<u8> = builder.build().unwrap();
        assert_eq!(db.resolution(), 16);
        assert_eq!(db.stats().slot_count, 1 << 16);
    }

    #[test]
    fn test_builder_with_config() {
        let config = Config::default().with_resolution(8);
        let mut db = DBBuilder::new().config(config).build().unwrap();
        db.insert(Position::new(10.0, 10.0), "value").unwrap();
        assert_eq!(db.resolution(), 8);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result: Result<ProximityDB<u8>> = DBBuilder::new().resolution(33).build();
        assert!(matches!(result, Err(GeoproxError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_strict_coordinates() {
        let config = Config::default().with_clamp_coordinates(false);
        let mut db = DBBuilder::new().config(config).build().unwrap();
        assert!(matches!(
            db.insert(Position::new(91.0, 0.0), ()),
            Err(GeoproxError::InvalidInput(_))
        ));

        let mut clamped = DBBuilder::new().build().unwrap();
        clamped.insert(Position::new(91.0, 0.0), ()).unwrap();
        assert_eq!(clamped.len(), 1);
    }

    #[test]
    fn test_builder_custom_provider_stream() {
        let here = Position::new(1.0, 2.0);
        let table = GeohashTable::new().with(here, GeoHash::parse("1011").unwrap());

        let mut db: StreamDB<HashMap<String, AttributeValue>> = DBBuilder::new()
            .resolution(4)
            .provider(table)
            .build_stream(MapAttributes)
            .unwrap();

        let mut data = HashMap::new();
        data.insert("floors".to_string(), AttributeValue::from(3));
        db.insert(here, data).unwrap();

        assert_eq!(db.max_nearby("floors", &here, 4).unwrap(), Some(3.0));
        assert_eq!(db.log_len(), 1);
    }
}
