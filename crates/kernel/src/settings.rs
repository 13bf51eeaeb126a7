use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

const ENV_PREFIX: &str = "PROVISION";
const CONFIG_DIR_ENV: &str = "PROVISION_CONFIG_DIR";
const CONFIG_FILE: &str = "provision.toml";

/// Variables the official database image reads for its root user.
const CONTAINER_USERNAME_ENV: &str = "MONGO_INITDB_ROOT_USERNAME";
const CONTAINER_PASSWORD_ENV: &str = "MONGO_INITDB_ROOT_PASSWORD";
const ADMIN_USERNAME_ENV: &str = "PROVISION_ADMIN__USERNAME";
const ADMIN_PASSWORD_ENV: &str = "PROVISION_ADMIN__PASSWORD";

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, the config file, and `PROVISION_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let cfg = config::Config::builder()
            .add_source(config::File::from(config_dir.join(CONFIG_FILE)).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings
            .admin
            .apply_container_credentials(|key| std::env::var(key).ok());

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_app_name")]
    pub app_name: String,
    #[serde(default = "DatabaseSettings::default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_app_name() -> String {
        "provision".to_string()
    }

    fn default_server_selection_timeout_ms() -> u64 {
        10000
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            app_name: Self::default_app_name(),
            server_selection_timeout_ms: Self::default_server_selection_timeout_ms(),
        }
    }
}

/// Administrative principal used for the whole run.
#[derive(Clone, Deserialize)]
pub struct AdminSettings {
    #[serde(default = "AdminSettings::default_username")]
    pub username: String,
    #[serde(default = "AdminSettings::default_password")]
    pub password: String,
    /// Namespace the credential is defined in.
    #[serde(default = "AdminSettings::default_source")]
    pub source: String,
}

impl AdminSettings {
    fn default_username() -> String {
        "root".to_string()
    }

    fn default_password() -> String {
        "root".to_string()
    }

    fn default_source() -> String {
        "admin".to_string()
    }

    /// Take the container's root credential unless a `PROVISION_ADMIN__*` variable
    /// already pinned the value.
    pub fn apply_container_credentials<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(ADMIN_USERNAME_ENV).is_none() {
            if let Some(username) = lookup(CONTAINER_USERNAME_ENV) {
                self.username = username;
            }
        }
        if lookup(ADMIN_PASSWORD_ENV).is_none() {
            if let Some(password) = lookup(CONTAINER_PASSWORD_ENV) {
                self.password = password;
            }
        }
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: Self::default_username(),
            password: Self::default_password(),
            source: Self::default_source(),
        }
    }
}

impl fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapSettings {
    /// Upper bound on the whole run.
    #[serde(default = "BootstrapSettings::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Insert seed documents even when the collection already holds data.
    #[serde(default)]
    pub reseed: bool,
}

impl BootstrapSettings {
    fn default_timeout_secs() -> u64 {
        120
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            reseed: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_database_uri_is_localhost() {
        let settings = Settings::default();
        assert_eq!(settings.database.uri, "mongodb://127.0.0.1:27017");
        assert_eq!(
            settings.database.server_selection_timeout(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn default_admin_matches_container_root() {
        let admin = AdminSettings::default();
        assert_eq!(admin.username, "root");
        assert_eq!(admin.password, "root");
        assert_eq!(admin.source, "admin");
    }

    #[test]
    fn default_bootstrap_does_not_reseed() {
        let settings = BootstrapSettings::default();
        assert!(!settings.reseed);
        assert_eq!(settings.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn container_credentials_fill_in() {
        let mut admin = AdminSettings::default();
        admin.apply_container_credentials(lookup(&[
            ("MONGO_INITDB_ROOT_USERNAME", "operator"),
            ("MONGO_INITDB_ROOT_PASSWORD", "s3cret"),
        ]));
        assert_eq!(admin.username, "operator");
        assert_eq!(admin.password, "s3cret");
    }

    #[test]
    fn explicit_admin_variables_win() {
        let mut admin = AdminSettings {
            username: "pinned".to_string(),
            ..AdminSettings::default()
        };
        admin.apply_container_credentials(lookup(&[
            ("PROVISION_ADMIN__USERNAME", "pinned"),
            ("MONGO_INITDB_ROOT_USERNAME", "operator"),
        ]));
        assert_eq!(admin.username, "pinned");
    }

    #[test]
    fn admin_debug_hides_password() {
        let admin = AdminSettings {
            password: "hunter2".to_string(),
            ..AdminSettings::default()
        };
        assert!(!format!("{admin:?}").contains("hunter2"));
    }
}
