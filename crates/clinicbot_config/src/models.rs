// --- File: crates/clinicbot_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the built dashboard frontend, served as a fallback.
    #[serde(default)]
    pub static_dir: Option<String>,
}

// --- Logging Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// e.g. "info", "debug"
    pub level: Option<String>,
    /// When set, logs are additionally written to a daily rolling file in this directory.
    pub file_dir: Option<String>,
}

// --- Remote data backend ---
// The hosted database is reached over its REST gateway for day-to-day reads and
// writes; migrations use the direct Postgres connection.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Base URL of the REST gateway, e.g. https://xyz.example.co/rest/v1
    pub rest_url: String,
    /// Base URL of the auth gateway, e.g. https://xyz.example.co/auth/v1
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Public API key sent as `apikey` header. Usually "secret_from_env".
    pub api_key: String,
    /// Optional service key used as bearer for server-side writes.
    #[serde(default)]
    pub service_key: Option<String>,
    /// Direct connection string, only used by the migration tool.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

// --- Google Calendar Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub client_id: String,
    pub client_secret: String, // secret_from_env
    /// Redirect URI registered for the OAuth popup callback.
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// IANA zone the clinic works in; slots are interpreted in this zone.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// JSON file holding the OAuth token and the selected calendar id.
    #[serde(default = "default_token_store_path")]
    pub token_store_path: String,
    /// Calendar used when none has been selected yet.
    #[serde(default)]
    pub default_calendar_id: Option<String>,
    #[serde(default = "default_block_summary")]
    pub block_summary: String,
    #[serde(default = "default_lookahead_weeks")]
    pub lookahead_weeks: u32,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ReconcileConfig {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 250,
        }
    }
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_time_zone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_token_store_path() -> String {
    "data/gcal_token.json".to_string()
}

fn default_block_summary() -> String {
    "Horário bloqueado".to_string()
}

fn default_lookahead_weeks() -> u32 {
    12
}

// --- Dashboard polling ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub summary_interval_secs: u64,
    pub alerts_interval_secs: u64,
    pub controls_interval_secs: u64,
    pub appointments_interval_secs: u64,
    pub trends_interval_secs: u64,
    pub heatmap_interval_secs: u64,
    /// Window in days for trend and heatmap RPCs.
    pub trend_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            summary_interval_secs: 30,
            alerts_interval_secs: 30,
            controls_interval_secs: 30,
            appointments_interval_secs: 60,
            trends_interval_secs: 300,
            heatmap_interval_secs: 300,
            trend_days: 14,
        }
    }
}

// --- Route gating ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// The dashboard permission gate only runs when this is true.
    #[serde(default)]
    pub enforce_dashboard_permission: bool,
    #[serde(default = "default_allowed_roles")]
    pub allowed_roles: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            enforce_dashboard_permission: false,
            allowed_roles: default_allowed_roles(),
        }
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_allowed_roles() -> Vec<String> {
    vec!["admin".to_string(), "staff".to_string()]
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,
    #[serde(default)]
    pub use_dashboard: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}
