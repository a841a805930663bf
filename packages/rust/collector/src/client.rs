//! HTTP client for place pages.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use placeseo_resilience::{BreakerConfig, CircuitBreaker, RetryDecision, RetryPolicy};
use placeseo_shared::{CollectorConfig, PlaceSeoError, Result};

use crate::extract::extract_place;
use crate::model::RawPlace;

/// Fetches place pages through a circuit breaker wrapped around a retry loop.
///
/// An exhausted retry series counts as a single breaker failure. Once the
/// breaker opens, [`fetch_place`](Self::fetch_place) fails fast with
/// `PlaceSeoError::CircuitOpen` and no request is sent.
#[derive(Debug, Clone)]
pub struct PlaceClient {
    client: Client,
    endpoint: Url,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl PlaceClient {
    /// Build a client from `[collector]` settings with its own breaker.
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            PlaceSeoError::config(format!("invalid collector endpoint {endpoint:?}: {e}"))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout())
            .build()
            .map_err(|e| PlaceSeoError::Network(format!("failed to build HTTP client: {e}")))?;

        let breaker = CircuitBreaker::new(
            endpoint.host_str().unwrap_or("place-endpoint"),
            BreakerConfig {
                failure_threshold: config.failure_threshold,
                reset_timeout: config.reset_timeout(),
            },
        );

        Ok(Self {
            client,
            endpoint,
            breaker: Arc::new(breaker),
            retry: RetryPolicy::exponential(config.retry_attempts, config.retry_delay()),
        })
    }

    /// Share an existing breaker, e.g. one per endpoint across several clients.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// URL of the page for `place_id`.
    pub fn place_url(&self, place_id: &str) -> Result<Url> {
        if place_id.is_empty() || !place_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PlaceSeoError::validation(format!(
                "place_id {place_id:?} must be a non-empty alphanumeric id"
            )));
        }
        self.endpoint
            .join(place_id)
            .map_err(|e| PlaceSeoError::config(format!("cannot build place URL: {e}")))
    }

    /// Fetch and extract one place.
    ///
    /// 404 maps to `NotFound` and is not retried. Transport errors and other
    /// non-success statuses are retried; when every attempt fails the last
    /// error comes back inside `RetryExhausted`.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn fetch_place(&self, place_id: &str) -> Result<RawPlace> {
        let url = self.place_url(place_id)?;
        let attempts = self.retry.max_attempts;

        self.breaker
            .execute(|| async {
                self.retry
                    .run("fetch_place", || self.fetch_once(&url, place_id))
                    .await
                    .map_err(|err| {
                        if err.is_retryable() {
                            PlaceSeoError::RetryExhausted {
                                attempts,
                                source: Box::new(err),
                            }
                        } else {
                            err
                        }
                    })
            })
            .await
    }

    async fn fetch_once(&self, url: &Url, place_id: &str) -> Result<RawPlace> {
        debug!(%url, "fetching place page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PlaceSeoError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PlaceSeoError::not_found(
                format!("place {place_id}"),
                url.as_str(),
            ));
        }
        if !status.is_success() {
            return Err(PlaceSeoError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlaceSeoError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(extract_place(&body, place_id))
    }
}
