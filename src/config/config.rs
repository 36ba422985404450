use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub server: ServerConfig,
    pub docker: DockerConfig,
    pub cors: CorsConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Empty means bollard's local defaults (DOCKER_HOST or the platform socket)
    pub socket_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// A "*" entry allows any origin (credentials are then disabled)
    pub allowed_origins: Vec<String>,
}

/// Live-update channel tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LiveConfig {
    pub poll_interval_ms: u64,
    pub ping_interval_secs: u64,
    pub pong_timeout_secs: u64,
    /// Outbound frames queued per client before it counts as a failed write
    pub client_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            docker: DockerConfig::default(),
            cors: CorsConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            client_buffer: 64,
        }
    }
}

impl LiveConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    /// Intervals feed tokio timers, which reject a zero period
    pub fn validate(&self) -> Result<(), String> {
        let zero = [
            ("live.poll_interval_ms", self.poll_interval_ms),
            ("live.ping_interval_secs", self.ping_interval_secs),
            ("live.pong_timeout_secs", self.pong_timeout_secs),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        match zero {
            Some((name, _)) => Err(format!("{} must be greater than zero", name)),
            None => Ok(()),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.live.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if !Path::new(path).exists() {
            tracing::warn!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let config: Config = serde_json::from_str(
            r#"{ "server": { "port": 9000 }, "live": { "poll_interval_ms": 1000 } }"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.live.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.live.pong_timeout(), Duration::from_secs(60));
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:3000"]);
        assert!(config.docker.socket_path.is_empty());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut live = LiveConfig::default();
        assert!(live.validate().is_ok());

        live.poll_interval_ms = 0;
        let err = live.validate().unwrap_err();
        assert!(err.contains("poll_interval_ms"));

        let live = LiveConfig {
            ping_interval_secs: 0,
            ..LiveConfig::default()
        };
        assert!(live.validate().unwrap_err().contains("ping_interval_secs"));
    }

    #[test]
    fn load_refuses_a_zero_poll_interval() {
        let path = std::env::temp_dir().join(format!("harbord-zero-{}.json", std::process::id()));
        fs::write(&path, r#"{ "live": { "poll_interval_ms": 0 } }"#).unwrap();

        let result = Config::load(path.to_str().unwrap());
        fs::remove_file(&path).unwrap();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("/nonexistent/harbord-config.json").unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.live.ping_interval(), Duration::from_secs(30));
    }
}
