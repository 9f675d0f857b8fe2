use crate::{
    model::Coordinates,
    retry::{self, RetryDecision, RetryPolicy},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt::Debug, time::Duration};

pub mod openmeteo;
pub mod sunrise;

/// Provider payload exactly as received. Discarded once the typed values are extracted.
pub type RawObservation = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    CurrentWeather,
    AirQuality,
    SunTimes,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::CurrentWeather => "current_weather",
            ObservationKind::AirQuality => "air_quality",
            ObservationKind::SunTimes => "sun_times",
        }
    }

    pub const fn all() -> &'static [ObservationKind] {
        &[
            ObservationKind::CurrentWeather,
            ObservationKind::AirQuality,
            ObservationKind::SunTimes,
        ]
    }
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream provider for {kind} is unavailable: {reason}")]
    Unavailable { kind: ObservationKind, reason: String },
}

impl UpstreamError {
    pub fn kind(&self) -> ObservationKind {
        match self {
            UpstreamError::Unavailable { kind, .. } => *kind,
        }
    }
}

#[async_trait]
pub trait UpstreamClient: Send + Sync + Debug {
    async fn fetch(
        &self,
        coords: Coordinates,
        kind: ObservationKind,
    ) -> Result<RawObservation, UpstreamError>;
}

/// Base URLs of the three providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub weather: String,
    pub air_quality: String,
    pub sun_times: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather: openmeteo::FORECAST_URL.to_string(),
            air_quality: openmeteo::AIR_QUALITY_URL.to_string(),
            sun_times: sunrise::SUN_TIMES_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// All three providers served from one base URL, e.g. a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            weather: format!("{base}/v1/forecast"),
            air_quality: format!("{base}/v1/air-quality"),
            sun_times: format!("{base}/json"),
        }
    }

    pub fn url_for(&self, kind: ObservationKind) -> &str {
        match kind {
            ObservationKind::CurrentWeather => &self.weather,
            ObservationKind::AirQuality => &self.air_quality,
            ObservationKind::SunTimes => &self.sun_times,
        }
    }
}

/// `UpstreamClient` talking to the real providers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    http: Client,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

struct FailedAttempt {
    reason: String,
    decision: RetryDecision,
}

impl FailedAttempt {
    fn permanent(reason: String) -> Self {
        Self { reason, decision: RetryDecision::NoRetry }
    }
}

impl HttpUpstreamClient {
    pub fn new(endpoints: Endpoints, timeout: Duration, retry: RetryPolicy) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nowcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self { http, endpoints, retry })
    }

    async fn fetch_once(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<RawObservation, FailedAttempt> {
        let res = self.http.get(url).query(query).send().await.map_err(|e| FailedAttempt {
            reason: format!("request failed: {e}"),
            decision: retry::classify_error(&e),
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FailedAttempt {
            reason: format!("failed to read response body: {e}"),
            decision: retry::classify_error(&e),
        })?;

        if !status.is_success() {
            return Err(FailedAttempt {
                reason: format!("status {}: {}", status, truncate_body(&body)),
                decision: retry::classify_status(status),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| FailedAttempt::permanent(format!("malformed JSON: {e}")))
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch(
        &self,
        coords: Coordinates,
        kind: ObservationKind,
    ) -> Result<RawObservation, UpstreamError> {
        let url = self.endpoints.url_for(kind);
        let query = match kind {
            ObservationKind::CurrentWeather => openmeteo::forecast_query(coords),
            ObservationKind::AirQuality => openmeteo::air_quality_query(coords),
            ObservationKind::SunTimes => sunrise::sun_times_query(coords),
        };

        let mut attempt = 0;
        loop {
            match self.fetch_once(url, &query).await {
                Ok(raw) => {
                    tracing::debug!(%kind, attempt, "upstream fetch succeeded");
                    return Ok(raw);
                }
                Err(failed)
                    if failed.decision == RetryDecision::Retry
                        && attempt < self.retry.max_retries =>
                {
                    let backoff = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        %kind,
                        attempt = attempt + 1,
                        ?backoff,
                        reason = %failed.reason,
                        "upstream fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(failed) => {
                    return Err(UpstreamError::Unavailable { kind, reason: failed.reason });
                }
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Parse a provider payload into its typed response. A payload that does not
/// even have the expected shape yields an empty response.
pub(crate) fn parse_payload<T>(raw: &RawObservation, kind: ObservationKind) -> T
where
    T: DeserializeOwned + Default,
{
    T::deserialize(raw).unwrap_or_else(|err| {
        tracing::warn!(%kind, error = %err, "unexpected payload shape; ignoring it");
        T::default()
    })
}

/// Field helpers for `#[serde(deserialize_with)]`. A value of the wrong type
/// becomes `None` instead of failing the whole payload.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer, de::DeserializeOwned};
    use serde_json::Value;

    /// A nested object that is not an object reads as empty.
    pub fn block<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(T::deserialize(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(d)?.as_f64())
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(as_text(&Value::deserialize(d)?))
    }

    pub fn numbers<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<f64>>, D::Error> {
        Ok(elements(Value::deserialize(d)?, |v| v.as_f64()))
    }

    pub fn texts<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<String>>, D::Error> {
        Ok(elements(Value::deserialize(d)?, as_text))
    }

    fn elements<T>(value: Value, f: impl Fn(&Value) -> Option<T>) -> Vec<Option<T>> {
        match value {
            Value::Array(items) => items.iter().map(f).collect(),
            _ => Vec::new(),
        }
    }

    fn as_text(value: &Value) -> Option<String> {
        value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
