// Configuration module entry point
// Manages application configuration, command-line arguments, and runtime state

mod state;
mod types;

use clap::Parser;
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{ArchiverConfig, Config};

/// Prefix for environment overrides, e.g. `ARCHIVE_GATEWAY__SERVER__PORT=9000`
const ENV_PREFIX: &str = "ARCHIVE_GATEWAY";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (extension optional)
    #[arg(short = 'c', long, env = "ARCHIVE_GATEWAY_CONFIG", default_value = "config")]
    pub config: String,

    /// Load and print the configuration, then exit without starting the server
    #[arg(long)]
    pub validate: bool,
}

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(environment());

        Self::with_defaults(settings)?.build()?.try_deserialize()
    }

    /// Apply built-in defaults to a configuration builder
    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 30)?
            .set_default("http.server_name", "archive-gateway")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("archiver.bundled", false)?
            .set_default("archiver.bundled_path", "./bin/monolith")?
            .set_default("archiver.program", "monolith")?
            .set_default("archiver.kill_on_disconnect", true)
    }

    /// Built-in defaults only, no file or environment
    #[cfg(test)]
    pub fn defaults() -> Self {
        Self::with_defaults(config::Config::builder())
            .and_then(|builder| builder.build())
            .and_then(|settings| settings.try_deserialize())
            .expect("built-in defaults must deserialize")
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Environment layer: `ARCHIVE_GATEWAY__<SECTION>__<KEY>`
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Config {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Config::with_defaults(builder)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = from_toml("");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert!(!cfg.archiver.bundled);
        assert_eq!(cfg.archiver.program, "monolith");
        assert!(cfg.archiver.kill_on_disconnect);
        assert!(cfg.server.workers.is_none());
        assert!(cfg.performance.max_connections.is_none());
        assert_eq!(cfg.performance.shutdown_timeout, 30);
        assert_eq!(cfg.performance.header_read_timeout, 30);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let cfg = from_toml(
            r#"
            [server]
            port = 9000
            workers = 2

            [archiver]
            bundled = true
            bundled_path = "/opt/monolith/monolith"
            "#,
        );
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.workers, Some(2));
        assert!(cfg.archiver.bundled);
        assert_eq!(cfg.archiver.bundled_path, "/opt/monolith/monolith");
        assert_eq!(cfg.archiver.program, "monolith");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut vars = config::Map::new();
        vars.insert(
            "ARCHIVE_GATEWAY__ARCHIVER__BUNDLED_PATH".to_string(),
            "/srv/tools/monolith".to_string(),
        );
        vars.insert("ARCHIVE_GATEWAY__ARCHIVER__BUNDLED".to_string(), "true".to_string());
        vars.insert("ARCHIVE_GATEWAY__SERVER__PORT".to_string(), "9100".to_string());
        // Wrong prefix separator, not picked up
        vars.insert("ARCHIVE_GATEWAY_HTTP__SERVER_NAME".to_string(), "ignored".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::from_str(
                "[archiver]\nbundled_path = \"./from-file\"\n",
                config::FileFormat::Toml,
            ))
            .add_source(environment().source(Some(vars)));
        let cfg: Config = Config::with_defaults(builder)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(cfg.archiver.bundled);
        assert_eq!(cfg.archiver.bundled_path, "/srv/tools/monolith");
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.http.server_name, "archive-gateway");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = from_toml("[server]\nhost = \"0.0.0.0\"\nport = 3000\n");
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "0.0.0.0:3000");

        let bad = from_toml("[server]\nhost = \"not a host\"\n");
        assert!(bad.get_socket_addr().is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["archive_gateway"]);
        assert!(!args.validate);

        let args = Args::parse_from(["archive_gateway", "-c", "/etc/gateway", "--validate"]);
        assert_eq!(args.config, "/etc/gateway");
        assert!(args.validate);
    }
}
