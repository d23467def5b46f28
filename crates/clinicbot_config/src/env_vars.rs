//! Environment variable naming for configuration overrides and secrets.
//!
//! Plain settings are overridden with `CLINICBOT__SECTION__KEY`. Secrets are kept
//! out of the config files: a value of `"secret_from_env"` is replaced by
//! `CLINICBOT_SECRET_SECTION_KEY`, falling back to the short `SECTION_KEY` form.

use std::env;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "CLINICBOT";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "CLINICBOT_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Marker value in config files that is replaced from the environment.
pub const SECRET_MARKER: &str = "secret_from_env";

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a configuration path to an environment variable name
///
/// `"server.host"` becomes `"CLINICBOT__SERVER__HOST"`.
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to an environment variable name
///
/// `"gcal.client_secret"` becomes `"CLINICBOT_SECRET_GCAL_CLIENT_SECRET"`.
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Short form without prefix: `"database.api_key"` becomes `"DATABASE_API_KEY"`.
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 2 {
        return path.to_uppercase();
    }

    let service = parts[0];
    let key = parts[1..].join(SECRET_SEPARATOR);
    format!("{}_{}", service, key).to_uppercase()
}

/// Get an environment variable for a secret path, trying the prefixed name first.
pub fn get_secret_env_var(path: &str) -> Option<String> {
    let env_var = secret_path_to_env_var(path);
    if let Ok(value) = env::var(&env_var) {
        return Some(value);
    }

    let legacy_env_var = legacy_secret_path_to_env_var(path);
    env::var(&legacy_env_var).ok()
}

/// Check if a path names a secret.
///
/// Paths containing "secret", "key", "password" or "token" are secret, and so is
/// the direct Postgres connection string since it embeds credentials.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret")
        || path_lower.contains("key")
        || path_lower.contains("password")
        || path_lower.contains("token")
        || path_lower.contains("postgres_url")
}

/// Replace every `"secret_from_env"` string in `value` with its environment value.
///
/// Returns the dotted paths for which no environment value was found; those
/// keep the marker so that the caller can decide how loud to be about it.
pub fn inject_env_vars(value: &mut serde_json::Value) -> Vec<String> {
    use serde_json::Value;

    fn walk(path: Vec<String>, obj: &mut Value, missing: &mut Vec<String>) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    walk(new_path, v, missing);
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter_mut().enumerate() {
                    let mut new_path = path.clone();
                    new_path.push(i.to_string());
                    walk(new_path, v, missing);
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                match get_secret_env_var(&path_str) {
                    Some(env_val) => *s = env_val,
                    None => missing.push(path_str),
                }
            }
            _ => {}
        }
    }

    let mut missing = Vec::new();
    walk(vec![], value, &mut missing);
    missing
}

/// Mask every secret-looking string value, for logging the effective config.
pub fn redact_secrets(value: &mut serde_json::Value) {
    use serde_json::Value;

    fn walk(path: &str, obj: &mut Value) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let child = if path.is_empty() {
                        k.clone()
                    } else {
                        format!("{}.{}", path, k)
                    };
                    walk(&child, v);
                }
            }
            Value::String(s) if is_secret_path(path) && !s.is_empty() => {
                *s = "***".to_string();
            }
            _ => {}
        }
    }

    walk("", value);
}
