//! Database configuration.

use crate::error::{GeoproxError, Result as GeoproxResult};
use crate::index::MAX_RESOLUTION;
use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Settings consumed by [`DBBuilder`](crate::DBBuilder).
///
/// # Examples
///
/// ```rust
/// use geoprox::Config;
///
/// let config = Config::default().with_resolution(20);
/// assert_eq!(config.resolution, 20);
/// assert!(config.clamp_coordinates);
///
/// // Missing fields fall back to their defaults
/// let config = Config::from_json(r#"{ "resolution": 12 }"#).unwrap();
/// assert_eq!(config.resolution, 12);
/// assert!(config.clamp_coordinates);
///
/// assert!(Config::from_json(r#"{ "resolution": 40 }"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bits of geohash kept per entry. The index allocates `2^resolution`
    /// slots, so memory grows exponentially with this value.
    #[serde(default = "Config::default_resolution")]
    pub resolution: usize,

    /// Clamp out-of-range coordinates onto the valid range (with a warning)
    /// instead of rejecting them. Only affects the default base32 provider.
    #[serde(default = "Config::default_clamp_coordinates")]
    pub clamp_coordinates: bool,
}

impl Config {
    const fn default_resolution() -> usize {
        16
    }

    const fn default_clamp_coordinates() -> bool {
        true
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_clamp_coordinates(mut self, clamp: bool) -> Self {
        self.clamp_coordinates = clamp;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.resolution > MAX_RESOLUTION {
            return Err(format!(
                "Resolution must be at most {} bits, got {}",
                MAX_RESOLUTION, self.resolution
            ));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) mapped into the crate error type.
    pub(crate) fn check(&self) -> GeoproxResult<()> {
        self.validate().map_err(GeoproxError::InvalidConfig)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: Self::default_resolution(),
            clamp_coordinates: Self::default_clamp_coordinates(),
        }
    }
}
