//! HTTP client for the Realtime Database REST streaming endpoint.
//!
//! [`RtdbClient`] holds the database URL and optional auth credential.
//! [`RtdbClient::open_stream`] issues `GET {base}/{path}.json` with
//! `Accept: text/event-stream` and returns the live response whose body is
//! the event stream.

use reqwest::header::ACCEPT;

use crate::transport::FeedError;

pub struct RtdbClient {
    base_url: String,
    auth: Option<String>,
    http: reqwest::Client,
}

impl RtdbClient {
    /// * `base_url` - database URL, e.g. `https://<db>.firebasedatabase.app`.
    /// * `auth`     - database secret or ID token, sent as `?auth=`.
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// REST URL for `path`, without credentials.
    pub fn stream_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    /// Open the event stream for `path`.
    ///
    /// Non-2xx responses (bad path, denied by rules, invalid auth) are
    /// reported as [`FeedError::Connection`].
    pub async fn open_stream(&self, path: &str) -> Result<reqwest::Response, FeedError> {
        let mut request = self
            .http
            .get(self.stream_url(path))
            .header(ACCEPT, "text/event-stream");
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth)]);
        }

        let response = request.send().await.map_err(|e| {
            FeedError::Connection(format!("Failed to reach {}: {e}", self.base_url))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Connection(format!(
                "Stream request for {path} rejected ({status}): {}",
                body.trim()
            )));
        }

        Ok(response)
    }
}
