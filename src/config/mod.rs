// Configuration module entry point

mod types;

use std::net::SocketAddr;

pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load `config.toml` (if present) and `DISPATCH__*` environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (extension optional)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("DISPATCH").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("http.server_name", "handler-dispatch/0.1")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("performance.keep_alive", true)?
            .set_default("performance.request_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
