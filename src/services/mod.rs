//! Clients for the external services the storefront consumes.
//!
//! Each provider is optional; when its credentials are not configured the
//! dependent endpoints answer 503.

pub mod ai;
pub mod events;
pub mod payments;
pub mod vision;

use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}
