use crate::error::OracleError;
use crate::event::Event;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Read-only view of the event provider.
#[async_trait]
pub trait EventOracle: Send + Sync {
    /// `Ok(None)` when the provider does not know the event.
    async fn fetch_event(&self, event_id: &str) -> Result<Option<Event>, OracleError>;

    async fn fetch_all_events(&self) -> Result<Vec<Event>, OracleError>;
}

// Line provider HTTP client
#[derive(Clone)]
pub struct LineProviderClient {
    http_client: Client,
    base_url: Url,
}

impl LineProviderClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        // Connection pooling and a hard per-request timeout; a hung provider
        // must surface as Unavailable rather than stall a sweep.
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| OracleError::Unavailable(format!("invalid provider url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(OracleError::Unavailable(format!(
                "provider url {base_url} cannot be a base"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            // Drop the empty trailing segment of "http://host:8000/"
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl EventOracle for LineProviderClient {
    async fn fetch_event(&self, event_id: &str) -> Result<Option<Event>, OracleError> {
        let url = self.endpoint(&["event", event_id]);
        debug!("GET {}", url);

        let response = self.http_client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(OracleError::Unavailable(format!(
                "line provider returned {} for event {}",
                response.status(),
                event_id
            )));
        }

        let event = response.json::<Event>().await?;
        Ok(Some(event))
    }

    async fn fetch_all_events(&self) -> Result<Vec<Event>, OracleError> {
        let url = self.endpoint(&["events"]);
        debug!("GET {}", url);

        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(OracleError::Unavailable(format!(
                "line provider returned {} for event list",
                response.status()
            )));
        }

        Ok(response.json::<Vec<Event>>().await?)
    }
}
