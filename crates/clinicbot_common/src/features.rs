//! Runtime feature switches.
//!
//! A feature is served only when its `use_*` flag is set and its config
//! section is present. Handlers answer 503 otherwise.

use clinicbot_config::AppConfig;

fn is_feature_enabled<T>(use_feature: bool, feature_config: Option<&T>) -> bool {
    use_feature && feature_config.is_some()
}

/// Check if the Google Calendar integration is enabled at runtime.
pub fn is_gcal_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(config.use_gcal, config.gcal.as_ref())
}

/// Check if the metrics and controls dashboard is enabled at runtime.
pub fn is_dashboard_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(config.use_dashboard, config.database.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicbot_config::parse_config_value;
    use serde_json::json;

    #[test]
    fn test_flag_without_section_stays_disabled() {
        let config = parse_config_value(json!({
            "server": {"host": "127.0.0.1", "port": 8086},
            "use_gcal": true,
            "use_dashboard": true
        }))
        .expect("config should parse");
        assert!(!is_gcal_enabled(&config));
        assert!(!is_dashboard_enabled(&config));

        let config = parse_config_value(json!({
            "server": {"host": "127.0.0.1", "port": 8086},
            "use_dashboard": true,
            "database": {"rest_url": "https://db.example/rest/v1", "api_key": "anon"}
        }))
        .expect("config should parse");
        assert!(is_dashboard_enabled(&config));
        assert!(!is_gcal_enabled(&config));
    }
}
