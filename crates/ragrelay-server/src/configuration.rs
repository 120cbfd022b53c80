use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, Environment};
use ragrelay::encoder::DEFAULT_PACING;
use ragrelay::upstream::http::{UpstreamConfig, DEFAULT_TIMEOUT};
use serde::Deserialize;

use crate::error::{to_env_var, ConfigError};

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamSettings {
    /// Base URL of the answer service; there is no default on purpose,
    /// the relay should never silently talk to a guessed endpoint.
    pub host: String,
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamSettings {
    pub fn to_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            host: self.host.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl RelaySettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub relay: RelaySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            // Relay defaults
            .set_default("relay.pacing_ms", default_pacing_ms() as i64)?
            .set_default("upstream.timeout_secs", default_upstream_timeout_secs() as i64)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("RAGRELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Handle missing field errors specially
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants.
                // The only required fields live under [upstream].
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `host`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    let env_var = to_env_var(&format!("upstream.{}", field));
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pacing_ms() -> u64 {
    DEFAULT_PACING.as_millis() as u64
}

fn default_upstream_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("RAGRELAY_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        // Only the upstream host is required
        env::set_var("RAGRELAY_UPSTREAM__HOST", "http://localhost:8001");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.upstream.host, "http://localhost:8001");
        assert_eq!(settings.upstream.timeout_secs, 60);
        assert_eq!(settings.relay.pacing_ms, 30);

        env::remove_var("RAGRELAY_UPSTREAM__HOST");
    }

    #[test]
    #[serial]
    fn test_missing_upstream_host_names_the_env_var() {
        clean_env();

        let err = Settings::new().unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("RAGRELAY_UPSTREAM__HOST"),
            "unexpected error: {}",
            message
        );
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("RAGRELAY_SERVER__PORT", "8080");
        env::set_var("RAGRELAY_UPSTREAM__HOST", "http://importer:8001");
        env::set_var("RAGRELAY_UPSTREAM__TIMEOUT_SECS", "120");
        env::set_var("RAGRELAY_RELAY__PACING_MS", "5");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.upstream.host, "http://importer:8001");
        assert_eq!(settings.upstream.timeout_secs, 120);
        assert_eq!(settings.relay.pacing_ms, 5);
        assert_eq!(settings.relay.pacing(), Duration::from_millis(5));

        env::remove_var("RAGRELAY_SERVER__PORT");
        env::remove_var("RAGRELAY_UPSTREAM__HOST");
        env::remove_var("RAGRELAY_UPSTREAM__TIMEOUT_SECS");
        env::remove_var("RAGRELAY_RELAY__PACING_MS");
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
