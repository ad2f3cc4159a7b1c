//! HTTP client for the assignment portal.
//!
//! Fetches one page per call and parses its assignment links. Requests go
//! out one at a time; timeouts are enforced by the underlying `reqwest` client.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use themis_shared::{AssignmentLink, AssignmentSource, PullConfig, Result, ThemisError};

use crate::parser::{extract_assignments, parse_selector};

/// User-Agent string for portal requests.
const USER_AGENT: &str = concat!("themis/", env!("CARGO_PKG_VERSION"));

/// Portal page fetcher implementing [`AssignmentSource`].
pub struct PortalClient {
    client: Client,
    selector: Selector,
}

impl PortalClient {
    /// Create a client with the given timeout, link selector and optional session cookie.
    pub fn new(timeout: Duration, link_selector: &str, session_cookie: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ThemisError::config(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| ThemisError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            selector: parse_selector(link_selector)?,
        })
    }

    /// Create a client from merged runtime config.
    pub fn from_config(config: &PullConfig) -> Result<Self> {
        Self::new(
            config.timeout,
            &config.link_selector,
            config.session_cookie.as_deref(),
        )
    }

    /// GET `url` and return the body of a successful response.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_page(&self, url: &Url) -> Result<String> {
        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ThemisError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ThemisError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ThemisError::Network(format!("{url}: body read failed: {e}")))
    }
}

impl AssignmentSource for PortalClient {
    async fn list_assignments(&self, url: &str) -> Result<Vec<AssignmentLink>> {
        let page_url =
            Url::parse(url).map_err(|e| ThemisError::fetch(url, format!("invalid URL: {e}")))?;
        let body = self.fetch_page(&page_url).await?;

        let doc = Html::parse_document(&body);
        let links = extract_assignments(&doc, &self.selector, &page_url);
        debug!(%page_url, links = links.len(), "parsed assignment links");
        Ok(links)
    }
}
