//! Configuration loading and typed config structures for the feed server.
//!
//! The configuration lives in `heatfeed-config.yaml` next to the binary's
//! working directory (or wherever `HEATFEED_CONFIG` points). Every field has
//! a default, so an absent file or an empty document yields a working
//! server on `0.0.0.0:8080` with a 3 second tick.

use std::path::Path;

use heatfeed_types::{DEFAULT_REGION, GeoPoint, SOMNATH};
use serde::Deserialize;

use crate::router::RESERVED_ROUTES;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level feed server configuration.
///
/// Mirrors the structure of `heatfeed-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeatfeedConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Tick loop and simulated intensity settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// The point of interest the crowd cluster is generated around.
    #[serde(default)]
    pub point_of_interest: PointOfInterestConfig,
}

impl HeatfeedConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `HEATFEED_HOST` overrides `server.host`
    /// - `HEATFEED_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_with_overrides(&contents, env_lookup)
    }

    /// Parse configuration from a YAML string, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with_overrides(yaml, |_| None)
    }

    /// Parse configuration from a YAML string, then apply listener
    /// overrides from `lookup` before validating.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse), plus [`ConfigError::Invalid`] for a
    /// bad `HEATFEED_PORT`.
    pub fn parse_with_overrides<F>(yaml: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and normalize the `WebSocket` path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.feed.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "feed.tick_interval_ms must be greater than 0".to_owned(),
            ));
        }
        if self.feed.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid(
                "feed.broadcast_capacity must be greater than 0".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.feed.initial_intensity) {
            return Err(ConfigError::Invalid(format!(
                "feed.initial_intensity must be within [0, 1], got {}",
                self.feed.initial_intensity
            )));
        }
        if !self.server.ws_path.starts_with('/') {
            self.server.ws_path = format!("/{}", self.server.ws_path);
        }
        validate_ws_path(&self.server.ws_path)
    }
}

/// Process environment lookup used for listener overrides.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Reject `WebSocket` paths the router cannot register.
///
/// Only plain segments of unreserved URL characters are allowed, which
/// rules out route captures and wildcards. The path must not shadow one of
/// the fixed routes.
fn validate_ws_path(path: &str) -> Result<(), ConfigError> {
    if RESERVED_ROUTES.contains(&path) {
        return Err(ConfigError::Invalid(format!(
            "server.ws_path {path} collides with a built-in route"
        )));
    }
    let plain = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~'));
    if !plain {
        return Err(ConfigError::Invalid(format!(
            "server.ws_path {path} may only contain letters, digits and - _ . ~ /"
        )));
    }
    if path.contains("//") {
        return Err(ConfigError::Invalid(format!(
            "server.ws_path {path} has an empty segment"
        )));
    }
    Ok(())
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route the heat-map `WebSocket` is served on.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

impl ServerConfig {
    /// Apply `HEATFEED_HOST` / `HEATFEED_PORT` overrides from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `HEATFEED_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HEATFEED_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("HEATFEED_PORT") {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("invalid HEATFEED_PORT {port}: {e}")))?;
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
        }
    }
}

/// Tick loop configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Point-of-interest intensity at startup.
    #[serde(default = "default_initial_intensity")]
    pub initial_intensity: f64,

    /// Whether the simulated gathering starts active.
    #[serde(default = "default_true")]
    pub gathering_active: bool,

    /// Capacity of the viewer broadcast channel.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Region label reported in `full_update` replies.
    #[serde(default = "default_region")]
    pub region: String,

    /// Fixed RNG seed. A fresh OS seed is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl FeedConfig {
    /// The tick period as a [`std::time::Duration`].
    pub const fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            initial_intensity: default_initial_intensity(),
            gathering_active: true,
            broadcast_capacity: default_broadcast_capacity(),
            region: default_region(),
            seed: None,
        }
    }
}

/// Point-of-interest configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointOfInterestConfig {
    /// Display name used in the map popup.
    #[serde(default = "default_poi_name")]
    pub name: String,

    /// Latitude in decimal degrees.
    #[serde(default = "default_poi_lat")]
    pub lat: f64,

    /// Longitude in decimal degrees.
    #[serde(default = "default_poi_lng")]
    pub lng: f64,
}

impl PointOfInterestConfig {
    /// The configured location.
    pub const fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

impl Default for PointOfInterestConfig {
    fn default() -> Self {
        Self {
            name: default_poi_name(),
            lat: default_poi_lat(),
            lng: default_poi_lng(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    String::from("/heatmap-updates")
}

const fn default_tick_interval_ms() -> u64 {
    3000
}

const fn default_initial_intensity() -> f64 {
    0.5
}

const fn default_true() -> bool {
    true
}

const fn default_broadcast_capacity() -> usize {
    64
}

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

fn default_poi_name() -> String {
    String::from("Somnath Temple")
}

const fn default_poi_lat() -> f64 {
    SOMNATH.lat
}

const fn default_poi_lng() -> f64 {
    SOMNATH.lng
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let mut config = HeatfeedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.ws_path, "/heatmap-updates");
        assert_eq!(config.feed.tick_interval_ms, 3000);
        assert!(config.feed.gathering_active);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r#"
server:
  port: 9000
  ws_path: "live"
feed:
  tick_interval_ms: 1500
  gathering_active: false
  seed: 7
point_of_interest:
  name: "Dwarkadhish"
  lat: 22.2376
  lng: 68.9674
"#;
        let config = HeatfeedConfig::parse(yaml).unwrap();
        assert_eq!(config.server.ws_path, "/live");
        assert_eq!(config.feed.tick_interval_ms, 1500);
        assert!(!config.feed.gathering_active);
        assert_eq!(config.feed.seed, Some(7));
        assert_eq!(config.point_of_interest.name, "Dwarkadhish");
        assert_eq!(config.feed.broadcast_capacity, 64);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = HeatfeedConfig::parse("").unwrap();
        assert_eq!(config.feed, FeedConfig::default());
        assert_eq!(config.point_of_interest.location(), SOMNATH);
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let result = HeatfeedConfig::parse("feed:\n  tick_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_intensity() {
        let result = HeatfeedConfig::parse("feed:\n  initial_intensity: 1.5\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_reserved_ws_path() {
        for path in ["/health", "health", "/api/status", "/", ""] {
            let yaml = format!("server:\n  ws_path: \"{path}\"\n");
            let result = HeatfeedConfig::parse(&yaml);
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "{path}");
        }
    }

    #[test]
    fn rejects_unroutable_ws_path() {
        for path in ["/{id}", "/*rest", "/:feed", "/live feed", "/a//b"] {
            let yaml = format!("server:\n  ws_path: \"{path}\"\n");
            let result = HeatfeedConfig::parse(&yaml);
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "{path}");
        }
    }

    #[test]
    fn accepts_nested_ws_path() {
        let config =
            HeatfeedConfig::parse("server:\n  ws_path: \"feeds/somnath-v2\"\n").unwrap();
        assert_eq!(config.server.ws_path, "/feeds/somnath-v2");
    }

    #[test]
    fn parse_ignores_process_environment() {
        let config = HeatfeedConfig::parse("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn overrides_apply_before_validation() {
        let config = HeatfeedConfig::parse_with_overrides("server:\n  port: 9000\n", |key| {
            (key == "HEATFEED_PORT").then(|| "9100".to_owned())
        })
        .unwrap();
        assert_eq!(config.server.port, 9100);

        let result = HeatfeedConfig::parse_with_overrides("", |key| {
            (key == "HEATFEED_PORT").then(|| "99999".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn env_overrides_listener() {
        let mut server = ServerConfig::default();
        server
            .apply_overrides(|key| match key {
                "HEATFEED_HOST" => Some("127.0.0.1".to_owned()),
                "HEATFEED_PORT" => Some("9191".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 9191);
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut server = ServerConfig::default();
        let result = server.apply_overrides(|key| {
            (key == "HEATFEED_PORT").then(|| "eighty".to_owned())
        });
        assert!(result.is_err());
    }
}
