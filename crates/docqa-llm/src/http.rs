//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create an HTTP client with the standard docqa configuration.
///
/// Config: 30s connect timeout, `request_timeout` overall timeout, rustls TLS,
/// `docqa/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn client_with_timeout(request_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(request_timeout)
        .user_agent(concat!("docqa/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}

/// Client with a 120s request timeout.
#[must_use]
pub fn default_client() -> reqwest::Client {
    client_with_timeout(Duration::from_secs(120))
}
