//! Configuration for a signaling session

use crate::error::SignalingError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on the transport handshake
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Session behaviour knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Connect attempts that take longer are reported as unreachable (default: 2000ms)
    pub connect_timeout_ms: u64,

    /// Send `listStreamers` on connect and subscribe to a streamer from the
    /// first list received (default: true)
    pub auto_subscribe: bool,

    /// Streamer to pick when auto-subscribing, if the server lists it
    pub preferred_streamer: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            auto_subscribe: true,
            preferred_streamer: None,
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_auto_subscribe(mut self, enabled: bool) -> Self {
        self.auto_subscribe = enabled;
        self
    }

    pub fn with_preferred_streamer(mut self, streamer_id: impl Into<String>) -> Self {
        self.preferred_streamer = Some(streamer_id.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SignalingError> {
        if self.connect_timeout_ms == 0 {
            return Err(SignalingError::InvalidConfig(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.preferred_streamer.as_deref() == Some("") {
            return Err(SignalingError::InvalidConfig(
                "preferred_streamer must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Pick the streamer to subscribe to from a server-provided list
    pub(crate) fn choose_streamer<'a>(&self, ids: &'a [String]) -> Option<&'a String> {
        self.preferred_streamer
            .as_ref()
            .and_then(|preferred| ids.iter().find(|id| *id == preferred))
            .or_else(|| ids.first())
    }
}
