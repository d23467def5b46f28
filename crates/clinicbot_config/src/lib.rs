use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub mod env_vars;
pub mod models;
pub use models::*;

/// Loads the layered configuration from the default config directory.
///
/// The directory is taken from `CONFIG_DIR` and falls back to `./config`.
/// Sources, from lowest to highest priority:
///
/// 1. `config/default.{toml,yaml,json}`
/// 2. `config/{RUN_ENV}.{toml,yaml,json}` (`RUN_ENV` defaults to `debug`)
/// 3. environment variables `CLINICBOT__SECTION__KEY`
///
/// Afterwards every `"secret_from_env"` marker is resolved from the environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();
    let config_dir = env::var("CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));
    load_config_from(&config_dir)
}

/// Same as [`load_config`] but reads the files from `config_dir`.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env_vars::get_config_prefix();

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);
    debug!(
        "Loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let raw: serde_json::Value = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(&prefix)
                .prefix_separator(env_vars::CONFIG_SEPARATOR)
                .separator(env_vars::CONFIG_SEPARATOR)
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    parse_config_value(raw)
}

/// Resolves secret markers in an already-parsed config tree and deserializes it.
pub fn parse_config_value(mut raw: serde_json::Value) -> Result<AppConfig, ConfigError> {
    let missing = env_vars::inject_env_vars(&mut raw);
    for path in &missing {
        warn!("No environment value found for secret '{}'", path);
    }
    serde_json::from_value(raw)
        .map_err(|err| ConfigError::Message(format!("failed to parse config: {err}")))
}

static INIT_DOTENV: OnceCell<String> = OnceCell::new();

/// Loads the dotenv file once per process and returns the path that was tried.
///
/// `DOTENV_OVERRIDE` wins; otherwise `.env` in the working directory is used.
pub fn ensure_dotenv_loaded() -> String {
    INIT_DOTENV
        .get_or_init(|| {
            let dotenv_path =
                env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());
            dotenv::from_filename(&dotenv_path).ok();
            dotenv_path
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let config = parse_config_value(json!({
            "server": { "host": "127.0.0.1", "port": 8080 }
        }))
        .expect("minimal config should parse");

        assert!(!config.use_gcal);
        assert!(config.gcal.is_none());
        assert_eq!(config.dashboard.summary_interval_secs, 30);
        assert_eq!(config.dashboard.trends_interval_secs, 300);
        assert!(!config.auth.enforce_dashboard_permission);
        assert_eq!(config.auth.login_path, "/login");
    }

    #[test]
    fn test_parse_gcal_section_defaults() {
        let config = parse_config_value(json!({
            "server": { "host": "0.0.0.0", "port": 3000 },
            "use_gcal": true,
            "gcal": {
                "client_id": "client",
                "client_secret": "plain-secret",
                "redirect_uri": "http://localhost:3000/api/gcal/auth/callback"
            }
        }))
        .expect("gcal config should parse");

        let gcal = config.gcal.expect("gcal section");
        assert_eq!(gcal.lookahead_weeks, 12);
        assert_eq!(gcal.reconcile.max_attempts, 3);
        assert_eq!(gcal.time_zone, "America/Sao_Paulo");
        assert_eq!(gcal.token_url, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_parse_rejects_missing_server() {
        let result = parse_config_value(json!({ "use_gcal": true }));
        assert!(result.is_err());
    }
}
