//! Configuration management for Microfin server
//!
//! Sources, lowest precedence first: `conf/application.yml` (optional),
//! `MICROFIN_*` environment variables (`__` separates key segments, e.g.
//! `MICROFIN_DB__URL`), then command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use microfin_common::MicrofinError;
use microfin_persistence::StorageMode;

use crate::startup::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_CONTEXT_PATH: &str = "/api";
pub const DEFAULT_TOKEN_LEEWAY_SECONDS: u64 = 60;
pub const DEFAULT_PRIMARY_ROLE_CACHE_TTL_SECONDS: u64 = 60;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "microfin-server", version, about)]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    database_url: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration from the command line, environment and config file
    pub fn new() -> anyhow::Result<Self> {
        let args = Cli::parse();

        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("MICROFIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = args.port {
            config_builder = config_builder.set_override("server.port", i64::from(v))?;
        }
        if let Some(v) = args.database_url {
            config_builder = config_builder.set_override("db.url", v)?;
        }

        Ok(Configuration {
            config: config_builder.build()?,
        })
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("server.address")
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int("server.port")
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Context path with a leading slash and no trailing slash; `/` becomes empty
    pub fn context_path(&self) -> String {
        let raw = self
            .config
            .get_string("server.context_path")
            .unwrap_or(DEFAULT_CONTEXT_PATH.to_string());
        let trimmed = raw.trim().trim_matches('/');

        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    // ========================================================================
    // Auth Configuration
    // ========================================================================

    /// Base64 HMAC secret used to verify bearer tokens
    pub fn token_secret(&self) -> anyhow::Result<String> {
        match self.config.get_string("auth.token.secret") {
            Ok(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(MicrofinError::ConfigError("auth.token.secret is required".to_string()).into()),
        }
    }

    pub fn token_leeway_seconds(&self) -> u64 {
        self.config
            .get_int("auth.token.leeway_seconds")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(DEFAULT_TOKEN_LEEWAY_SECONDS)
    }

    /// Pinned primary role id; when absent it is read from the system config store
    pub fn primary_role_id(&self) -> Option<String> {
        self.config
            .get_string("auth.primary_role.id")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    pub fn primary_role_cache_ttl(&self) -> Duration {
        let seconds = self
            .config
            .get_int("auth.primary_role.cache_ttl_seconds")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(DEFAULT_PRIMARY_ROLE_CACHE_TTL_SECONDS);

        Duration::from_secs(seconds)
    }

    /// Fail startup when exposed routes and stored policies disagree
    pub fn route_check_strict(&self) -> bool {
        self.config
            .get_bool("auth.route_check.strict")
            .unwrap_or(false)
    }

    pub fn seed_base_permissions(&self) -> bool {
        self.config
            .get_bool("auth.seed_base_permissions")
            .unwrap_or(true)
    }

    // ========================================================================
    // Database Configuration
    // ========================================================================

    /// Integer setting converted to `T`; `default` when unset, an error when
    /// malformed or out of range
    fn get_unsigned<T: TryFrom<i64>>(&self, key: &str, default: T) -> anyhow::Result<T> {
        match self.config.get_int(key) {
            Ok(value) => T::try_from(value).map_err(|_| {
                MicrofinError::ConfigError(format!("{} is out of range: {}", key, value)).into()
            }),
            Err(config::ConfigError::NotFound(_)) => Ok(default),
            Err(e) => Err(MicrofinError::ConfigError(format!("{}: {}", key, e)).into()),
        }
    }

    pub fn database_url(&self) -> Option<String> {
        self.config
            .get_string("db.url")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    pub fn persistence_mode(&self) -> StorageMode {
        if self.database_url().is_some() {
            StorageMode::ExternalDb
        } else {
            StorageMode::Memory
        }
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let url = self
            .database_url()
            .ok_or_else(|| MicrofinError::ConfigError("db.url is required".to_string()))?;
        let max_connections: u32 = self.get_unsigned("db.max_connections", 20)?;
        let min_connections: u32 = self.get_unsigned("db.min_connections", 1)?;
        let connect_timeout: u64 = self.get_unsigned("db.connect_timeout_seconds", 30)?;
        let sqlx_logging = self.config.get_bool("db.sqlx_logging").unwrap_or(false);

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .sqlx_logging(sqlx_logging)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        Ok(Database::connect(opt).await?)
    }

    // ========================================================================
    // Observability Configuration
    // ========================================================================

    pub fn metrics_enabled(&self) -> bool {
        self.config.get_bool("metrics.enabled").unwrap_or(true)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("logging.dir").ok(),
            self.config.get_bool("logging.console").unwrap_or(true),
            self.config.get_bool("logging.file").unwrap_or(false),
            self.config
                .get_string("logging.level")
                .unwrap_or("info".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration(pairs: &[(&str, &str)]) -> Configuration {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::default();

        assert_eq!(config.server_address(), "0.0.0.0");
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.context_path(), "/api");
        assert_eq!(config.persistence_mode(), StorageMode::Memory);
        assert_eq!(config.primary_role_cache_ttl(), Duration::from_secs(60));
        assert!(config.primary_role_id().is_none());
        assert!(!config.route_check_strict());
        assert!(config.token_secret().is_err());
    }

    #[test]
    fn test_context_path_normalization() {
        assert_eq!(
            configuration(&[("server.context_path", "admin/")]).context_path(),
            "/admin"
        );
        assert_eq!(
            configuration(&[("server.context_path", "/")]).context_path(),
            ""
        );
    }

    #[test]
    fn test_database_url_selects_external_db() {
        let config = configuration(&[("db.url", "postgres://localhost/microfin")]);
        assert_eq!(config.persistence_mode(), StorageMode::ExternalDb);

        let config = configuration(&[("db.url", " ")]);
        assert_eq!(config.persistence_mode(), StorageMode::Memory);
    }

    #[test]
    fn test_unsigned_settings_reject_negative_values() {
        let config = configuration(&[("db.max_connections", "-1")]);
        let err = config.get_unsigned::<u32>("db.max_connections", 20).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MicrofinError>(),
            Some(MicrofinError::ConfigError(_))
        ));

        let config = configuration(&[("db.connect_timeout_seconds", "15")]);
        assert_eq!(config.get_unsigned::<u64>("db.connect_timeout_seconds", 30).unwrap(), 15);
        assert_eq!(config.get_unsigned::<u32>("db.min_connections", 1).unwrap(), 1);
    }

    #[test]
    fn test_typed_values() {
        let config = configuration(&[
            ("server.port", "9090"),
            ("auth.token.secret", "c2VjcmV0"),
            ("auth.primary_role.id", "role-admin"),
            ("auth.primary_role.cache_ttl_seconds", "5"),
            ("auth.route_check.strict", "true"),
        ]);

        assert_eq!(config.server_port(), 9090);
        assert_eq!(config.token_secret().unwrap(), "c2VjcmV0");
        assert_eq!(config.primary_role_id().as_deref(), Some("role-admin"));
        assert_eq!(config.primary_role_cache_ttl(), Duration::from_secs(5));
        assert!(config.route_check_strict());
    }
}
