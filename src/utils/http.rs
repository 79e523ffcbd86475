use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

// Connection-level default; generation calls override the total timeout
// per request.
const CONNECT_TIMEOUT_SECS: u64 = 30;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
