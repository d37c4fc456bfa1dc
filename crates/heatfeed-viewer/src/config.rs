//! Viewer configuration.
//!
//! Loaded once at startup from the environment. `HEATFEED_URL` is the
//! single override point for the feed endpoint; the remaining variables
//! are tuning knobs with sensible defaults.

use std::time::Duration;

use heatfeed_types::DEFAULT_REGION;

use crate::error::ViewerError;

/// Feed endpoint used when `HEATFEED_URL` is not set.
pub const DEFAULT_FEED_URL: &str = "ws://localhost:8080/heatmap-updates";

/// Delay between a disconnect and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Complete viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// `WebSocket` URL of the feed.
    pub url: String,
    /// Region sent with `request_data` on every open.
    pub region: String,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_owned(),
            region: DEFAULT_REGION.to_owned(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `HEATFEED_URL` -- feed endpoint (default `ws://localhost:8080/heatmap-updates`)
    /// - `HEATFEED_REGION` -- region of interest (default `gujarat`)
    /// - `HEATFEED_RECONNECT_MS` -- reconnect delay in milliseconds, at least 1 (default 5000)
    pub fn from_env() -> Result<Self, ViewerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ViewerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let url = lookup("HEATFEED_URL").unwrap_or(defaults.url);
        let region = lookup("HEATFEED_REGION").unwrap_or(defaults.region);

        let reconnect_delay = match lookup("HEATFEED_RECONNECT_MS") {
            Some(raw) => {
                let ms: u64 = raw.parse().map_err(|e| {
                    ViewerError::Config(format!("invalid HEATFEED_RECONNECT_MS: {e}"))
                })?;
                if ms == 0 {
                    return Err(ViewerError::Config(
                        "HEATFEED_RECONNECT_MS must be greater than 0".to_owned(),
                    ));
                }
                Duration::from_millis(ms)
            }
            None => defaults.reconnect_delay,
        };

        Ok(Self {
            url,
            region,
            reconnect_delay,
        })
    }
}
