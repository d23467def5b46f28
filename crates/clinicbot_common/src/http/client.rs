// --- File: crates/clinicbot_common/src/http/client.rs ---
use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A static HTTP client shared by the REST integrations (backend gateway, OAuth token endpoint).
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
});
