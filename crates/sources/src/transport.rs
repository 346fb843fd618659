use crate::{Result, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;

const USER_AGENT: &str = concat!("civic-scrapers/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches page bodies for sources.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        log::debug!("GET {url}");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Canned responses keyed by URL fragment, for offline runs and tests.
///
/// A request is answered by the first fixture whose pattern occurs in the URL.
#[derive(Default)]
pub struct FixtureTransport {
    fixtures: Vec<(String, String)>,
    requests: Mutex<Vec<String>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, url_fragment: impl Into<String>, body: impl Into<String>) -> Self {
        self.fixtures.push((url_fragment.into(), body.into()));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.fixtures
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| SourceError::NoFixture(url.to_string()))
    }
}
