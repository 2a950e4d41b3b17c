//! Layered service settings.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/stockyard.toml` (optional)
//! 3. `STOCKYARD__*` environment variables (`STOCKYARD__SERVER__PORT=9000`),
//!    after `.env` has been loaded into the process environment

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use stockyard_observability::LogFormat;

const CONFIG_FILE: &str = "config/stockyard.toml";
const ENV_PREFIX: &str = "STOCKYARD";

/// Signing secret used when none is configured. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "stockyard-dev-secret-change-me";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres URL. Without one the service runs on the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub issuer: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: 6,
            issuer: "stockyard".to_string(),
            bootstrap_admin: None,
        }
    }
}

impl AuthSettings {
    /// The configured secret, or [`DEV_JWT_SECRET`].
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or(DEV_JWT_SECRET)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret.is_none()
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("issuer", &self.issuer)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish()
    }
}

/// Admin account seeded on startup when no users exist yet.
#[derive(Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from `.env`, the optional config file and the process
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to read .env");
            }
        }
        Self::build(environment())
    }

    fn build(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors.allowed_origins")
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    fn from_vars(vars: &[(&str, &str)]) -> Settings {
        let map: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::build(environment().source(Some(map))).unwrap()
    }

    #[test]
    fn defaults_apply_without_sources() {
        let s = from_vars(&[]);
        assert_eq!(s.bind_address(), "0.0.0.0:8080");
        assert!(s.database.url.is_none());
        assert_eq!(s.database.max_connections, 10);
        assert_eq!(s.auth.token_ttl_hours, 6);
        assert_eq!(s.auth.issuer, "stockyard");
        assert!(s.auth.uses_dev_secret());
        assert_eq!(s.auth.jwt_secret(), DEV_JWT_SECRET);
        assert_eq!(s.log.format, LogFormat::Json);
        assert_eq!(s.cors.allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn environment_overrides_nested_keys() {
        let s = from_vars(&[
            ("STOCKYARD__SERVER__PORT", "9000"),
            ("STOCKYARD__DATABASE__URL", "postgres://localhost/stockyard"),
            ("STOCKYARD__AUTH__JWT_SECRET", "s3cret"),
            ("STOCKYARD__AUTH__BOOTSTRAP_ADMIN__USERNAME", "root"),
            ("STOCKYARD__AUTH__BOOTSTRAP_ADMIN__PASSWORD", "changeme"),
            ("STOCKYARD__LOG__FORMAT", "pretty"),
            ("STOCKYARD__CORS__ALLOWED_ORIGINS", "http://a.test,http://b.test"),
        ]);
        assert_eq!(s.server.port, 9000);
        assert_eq!(s.database.url.as_deref(), Some("postgres://localhost/stockyard"));
        assert_eq!(s.auth.jwt_secret(), "s3cret");
        assert_eq!(s.auth.bootstrap_admin.as_ref().map(|a| a.username.as_str()), Some("root"));
        assert_eq!(s.log.format, LogFormat::Pretty);
        assert_eq!(s.cors.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let s = from_vars(&[
            ("STOCKYARD__AUTH__JWT_SECRET", "s3cret"),
            ("STOCKYARD__AUTH__BOOTSTRAP_ADMIN__USERNAME", "root"),
            ("STOCKYARD__AUTH__BOOTSTRAP_ADMIN__PASSWORD", "hunter22"),
        ]);
        let debug = format!("{s:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("root"));
    }
}
