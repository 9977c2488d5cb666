use crate::domain::window::EvictionMode;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowSettings {
    /// Initial rolling window in seconds. Adjustable at runtime.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub eviction: EvictionMode,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            eviction: EvictionMode::default(),
        }
    }
}

impl WindowSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestSettings {
    /// Samples buffered between the transport and the ingest loop.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_interval_secs() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    1024
}

/// Load `config/bench.toml` (optional) overlaid with `BENCH__*` environment variables.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/bench").required(false))
        .add_source(
            config::Environment::with_prefix("BENCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.window.interval(), Duration::from_secs(60));
        assert_eq!(config.window.eviction, EvictionMode::Single);
        assert_eq!(config.ingest.channel_capacity, 1024);
    }

    #[test]
    fn test_full_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [window]
            interval_secs = 10
            eviction = "sweep"

            [ingest]
            channel_capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.window.interval_secs, 10);
        assert_eq!(config.window.eviction, EvictionMode::Sweep);
        assert_eq!(config.ingest.channel_capacity, 16);
    }

    #[test]
    fn test_unknown_eviction_mode_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[window]\neviction = \"lazy\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        // No other test reads BENCH__ variables, so setting them here is safe.
        unsafe {
            std::env::set_var("BENCH__WINDOW__INTERVAL_SECS", "7");
            std::env::set_var("BENCH__WINDOW__EVICTION", "sweep");
        }
        let loaded = load_config();
        unsafe {
            std::env::remove_var("BENCH__WINDOW__INTERVAL_SECS");
            std::env::remove_var("BENCH__WINDOW__EVICTION");
        }

        let config = loaded.unwrap();
        assert_eq!(config.window.interval(), Duration::from_secs(7));
        assert_eq!(config.window.eviction, EvictionMode::Sweep);
        assert_eq!(config.ingest.channel_capacity, 1024);
    }

    #[test]
    fn test_shipped_config_parses() {
        let shipped = include_str!("../../config/bench.toml");
        let config: AppConfig = toml::from_str(shipped).unwrap();
        assert!(config.window.interval_secs > 0);
    }
}
