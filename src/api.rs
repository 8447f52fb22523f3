//! HTTP API client for the notification server.
//!
//! [`NotificationApi`] is the seam the runtime talks through; [`HttpApi`] is
//! the reqwest implementation. Every request is shaped like the browser's
//! XHR calls: session cookie, `X-Requested-With`, and no caching.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{Config, Endpoints};
use crate::constants::{CSRF_COOKIE, SESSION_COOKIE};
use crate::frame::ItemId;
use crate::state::InteractionCounts;

/// Server operations the sync runtime depends on.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Fetch the unread-notification summary body.
    async fn fetch_summary(&self) -> Result<String>;

    /// Fetch popover-ready detail content.
    async fn fetch_detail(&self) -> Result<String>;

    /// Fetch authoritative interaction counts for one item.
    async fn fetch_counts(&self, item_id: &ItemId) -> Result<InteractionCounts>;

    /// Mark every notification as read.
    async fn mark_all_read(&self) -> Result<()>;
}

/// Body of the interaction-count endpoint.
#[derive(Debug, Deserialize)]
struct CountsResponse {
    likes: u64,
    comments: u64,
}

/// reqwest-backed [`NotificationApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    server_url: String,
    session_id: String,
    csrf_token: String,
    endpoints: Endpoints,
}

impl HttpApi {
    /// Creates a client from configuration.
    ///
    /// Redirects are not followed: an expired session is answered with a
    /// redirect to the login page, which must surface as an error rather
    /// than as content.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::with_client(client, config))
    }

    /// Creates a client with a pre-configured HTTP client.
    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            server_url: config.base_url().to_string(),
            session_id: config.session_id.clone(),
            csrf_token: config.csrf_token.clone(),
            endpoints: config.endpoints.clone(),
        }
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    fn cookie_header(&self, with_csrf: bool) -> String {
        let mut cookies = Vec::new();
        if !self.session_id.is_empty() {
            cookies.push(format!("{SESSION_COOKIE}={}", self.session_id));
        }
        if with_csrf && !self.csrf_token.is_empty() {
            cookies.push(format!("{CSRF_COOKIE}={}", self.csrf_token));
        }
        cookies.join("; ")
    }

    /// Uncached XHR-style GET returning the response text.
    async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        // Cache buster, one per request
        let stamp = chrono::Utc::now().timestamp_millis().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("_", stamp.as_str())])
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Cache-Control", "no-cache")
            .header("Cookie", self.cookie_header(false))
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        if response.status().is_redirection() {
            anyhow::bail!("GET {url}: redirected ({}), session expired?", response.status());
        }
        if !response.status().is_success() {
            anyhow::bail!("GET {url}: {}", response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("GET {url}: unreadable body"))
    }
}

#[async_trait]
impl NotificationApi for HttpApi {
    async fn fetch_summary(&self) -> Result<String> {
        self.get_text(&self.endpoints.summary).await
    }

    async fn fetch_detail(&self) -> Result<String> {
        self.get_text(&self.endpoints.detail).await
    }

    async fn fetch_counts(&self, item_id: &ItemId) -> Result<InteractionCounts> {
        let url = self.url(&self.endpoints.interactions);

        let response = self
            .client
            .post(&url)
            .form(&[("id_value", item_id.as_ref())])
            .header("X-Requested-With", "XMLHttpRequest")
            .header("X-CSRFToken", &self.csrf_token)
            .header("Cache-Control", "no-cache")
            .header("Cookie", self.cookie_header(true))
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;

        if response.status().is_redirection() {
            anyhow::bail!("POST {url} for {item_id}: redirected ({}), session expired?", response.status());
        }
        if !response.status().is_success() {
            anyhow::bail!("POST {url} for {item_id}: {}", response.status());
        }

        let body: CountsResponse = response
            .json()
            .await
            .with_context(|| format!("POST {url}: invalid counts body"))?;

        Ok(InteractionCounts {
            item_id: item_id.clone(),
            likes: body.likes,
            comments: body.comments,
        })
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.get_text(&self.endpoints.mark_all_read).await?;
        log::info!("Marked all notifications as read");
        Ok(())
    }
}
