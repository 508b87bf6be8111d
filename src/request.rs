use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{Error, Result};

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final url of the response, after redirects.
    pub url: String,
    pub body: String,
}

/// The HTTP session every fetch goes through.
///
/// Cookies picked up along the way (most importantly the one granted after solving a
/// checkpoint) must be visible to every later request, so implementations share their
/// state between clones and concurrent callers.
#[async_trait]
pub trait Session: Send + Sync {
    /// GETs `url`. Non-2xx responses are errors.
    async fn get(&self, url: &str) -> Result<Page>;

    /// POSTs `form` url-encoded to `url` with explicit `Referer` and `Origin` headers.
    /// Returns the response status without judging it.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        referer: &str,
        origin: &str,
    ) -> Result<StatusCode>;
}

pub type SharedSession = Arc<dyn Session>;

/// `Session` backed by a cookie-keeping `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpSession {
    // Client uses Arc internally so we can clone cheaply
    client: Client,
}

impl HttpSession {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(crate::USER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(crate::ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn get(&self, url: &str) -> Result<Page> {
        debug!("GET {url}");
        let res = self.client.get(url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let url = res.url().to_string();
        let body = res.text().await?;
        Ok(Page { url, body })
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        referer: &str,
        origin: &str,
    ) -> Result<StatusCode> {
        debug!("POST {url}");
        let res = self
            .client
            .post(url)
            .header(REFERER, referer)
            .header(ORIGIN, origin)
            .form(form)
            .send()
            .await?;
        Ok(res.status())
    }
}
