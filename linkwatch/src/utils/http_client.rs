use std::{sync::OnceLock, time::Duration};

use tracing::{debug, warn};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the shared `reqwest::Client` used by the HTTP channels and the heartbeat.
///
/// `request_timeout = None` leaves requests unbounded.
pub fn build_client(request_timeout: Option<Duration>) -> reqwest::Client {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("linkwatch/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10));

    if let Some(timeout) = request_timeout.filter(|t| !t.is_zero()) {
        builder = builder.timeout(timeout);
    }

    builder.build().unwrap_or_else(|error| {
        warn!(error = %error, "Failed to create HTTP client; falling back to reqwest defaults");
        reqwest::Client::new()
    })
}
