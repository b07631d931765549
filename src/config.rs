//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Loaded once at startup and read-only afterwards.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default upstream agent WebSocket endpoint
pub const DEFAULT_UPSTREAM_URL: &str = "ws://localhost:8000/ws/ai-stream";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream agent connection configuration
    pub upstream: UpstreamConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Upstream agent connection configuration
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// WebSocket URL of the agent service
    pub url: String,
    /// Maximum time to establish the WebSocket connection (in seconds)
    pub connect_timeout_secs: u64,
    /// Maximum silence between two inbound frames (in seconds, 0 disables)
    pub idle_timeout_secs: u64,
    /// Maximum time spent on the closing handshake (in seconds)
    pub close_timeout_secs: u64,
    /// End the session after relaying a `{"type":"complete"}` frame
    pub close_on_complete_frame: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            connect_timeout_secs: 10,
            idle_timeout_secs: 120,
            close_timeout_secs: 5,
            close_on_complete_frame: true,
        }
    }
}

impl UpstreamConfig {
    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Idle timeout as a `Duration`, `None` when disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Close handshake timeout as a `Duration`
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = UpstreamConfig::default();
        Self {
            server: ServerConfig {
                port: env_or("PORT", 8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            upstream: UpstreamConfig {
                url: env::var("AGENT_WS_URL").unwrap_or(defaults.url),
                connect_timeout_secs: env_or(
                    "AGENT_CONNECT_TIMEOUT_SECS",
                    defaults.connect_timeout_secs,
                ),
                idle_timeout_secs: env_or("AGENT_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
                close_timeout_secs: env_or(
                    "AGENT_CLOSE_TIMEOUT_SECS",
                    defaults.close_timeout_secs,
                ),
                close_on_complete_frame: env_or(
                    "AGENT_CLOSE_ON_COMPLETE",
                    defaults.close_on_complete_frame,
                ),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// Unset or unparseable values fall back to the default
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
