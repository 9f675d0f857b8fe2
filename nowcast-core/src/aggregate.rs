use anyhow::Context;
use chrono::NaiveDateTime;
use std::{sync::Arc, time::Duration};

use crate::{
    Config,
    city::CityTable,
    features::FeatureEncoder,
    model::{AggregatedRecord, CURRENT_LOCATION, Coordinates, InvalidCoordinates, SunTimes},
    outlook,
    predict::{LinearModel, PredictError, PredictionService},
    provider::{
        HttpUpstreamClient, ObservationKind, RawObservation, UpstreamClient, UpstreamError,
        openmeteo, sunrise,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error(transparent)]
    InvalidCoordinates(#[from] InvalidCoordinates),
    #[error("City '{0}' not found")]
    UnknownCity(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Prediction(#[from] PredictError),
}

impl AggregateError {
    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AggregateError::InvalidCoordinates(_) => "invalid_coordinates",
            AggregateError::UnknownCity(_) => "unknown_city",
            AggregateError::Upstream(_) => "upstream_unavailable",
            AggregateError::Prediction(PredictError::FeatureMismatch { .. }) => "feature_mismatch",
            AggregateError::Prediction(PredictError::NonFinite(_)) => "prediction_failed",
        }
    }

    /// Whether the caller's input caused the failure (bad request / not found).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AggregateError::InvalidCoordinates(_) | AggregateError::UnknownCity(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorOptions {
    /// Deadline for each upstream fetch, retries included.
    pub provider_timeout: Duration,
    /// Propagate prediction failures instead of serving an "N/A" prediction.
    pub strict_prediction: bool,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(15),
            strict_prediction: false,
        }
    }
}

/// Owns the pipeline's collaborators and merges one record per request.
///
/// Cheap to clone; the model and the city table are shared read-only.
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: Arc<dyn UpstreamClient>,
    encoder: FeatureEncoder,
    predictor: PredictionService,
    cities: Arc<CityTable>,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        predictor: PredictionService,
        cities: CityTable,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            client,
            encoder: FeatureEncoder::new(),
            predictor,
            cities: Arc::new(cities),
            options,
        }
    }

    /// Aggregate everything known about `coords` at local time `now`.
    ///
    /// Coordinates that belong to a table city are labelled with its name,
    /// anything else with "Current Location".
    pub async fn aggregate(
        &self,
        coords: Coordinates,
        now: NaiveDateTime,
    ) -> Result<AggregatedRecord, AggregateError> {
        let location = self
            .cities
            .find_by_coordinates(coords)
            .map_or_else(|| CURRENT_LOCATION.to_string(), |city| city.name.clone());

        self.collect(coords, now, location).await
    }

    /// Aggregate a city from the table. Unknown keys fail before any network call.
    pub async fn aggregate_city(
        &self,
        key: &str,
        now: NaiveDateTime,
    ) -> Result<AggregatedRecord, AggregateError> {
        let city = self
            .cities
            .get(key)
            .ok_or_else(|| AggregateError::UnknownCity(key.to_string()))?;

        self.collect(city.coordinates(), now, city.name.clone()).await
    }

    /// Aggregate raw `lat`/`lon` request parameters. Missing or invalid
    /// values fail before any network call.
    pub async fn aggregate_live(
        &self,
        latitude: Option<&str>,
        longitude: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<AggregatedRecord, AggregateError> {
        let coords = Coordinates::parse(latitude, longitude)?;
        self.collect(coords, now, CURRENT_LOCATION.to_string()).await
    }

    async fn collect(
        &self,
        coords: Coordinates,
        now: NaiveDateTime,
        location: String,
    ) -> Result<AggregatedRecord, AggregateError> {
        tracing::debug!(lat = coords.latitude, lon = coords.longitude, %location, "aggregating");

        // Air quality and sun times never fail the request; a weather failure
        // drops them mid-flight.
        let secondary = async {
            let (air, sun) = tokio::join!(
                self.fetch(coords, ObservationKind::AirQuality),
                self.fetch(coords, ObservationKind::SunTimes),
            );
            Ok::<_, UpstreamError>((air, sun))
        };

        let (weather, (air, sun)) =
            tokio::try_join!(self.fetch(coords, ObservationKind::CurrentWeather), secondary)
                .inspect_err(|err| {
                    tracing::error!(error = %err, %location, "weather fetch failed; aborting");
                })?;

        let current = openmeteo::extract_snapshot(&weather);
        let hourly = outlook::hourly_outlook(&openmeteo::extract_hourly(&weather));
        let daily = outlook::daily_outlook(&openmeteo::extract_daily(&weather));

        let air_quality = match air {
            Ok(raw) => openmeteo::extract_air_quality(&raw),
            Err(err) => {
                tracing::warn!(error = %err, "air quality unavailable; using sentinel");
                None
            }
        };

        let sun = match sun {
            Ok(raw) => sunrise::extract_sun_times(&raw),
            Err(err) => {
                tracing::warn!(error = %err, "sun times unavailable; using sentinel");
                SunTimes::default()
            }
        };

        let features = self.encoder.encode(&current, now);
        let next_hour_prediction = match self.predictor.predict(&features) {
            Ok(value) => Some(value),
            Err(err) if self.options.strict_prediction => return Err(err.into()),
            Err(err) => {
                tracing::error!(error = %err, "prediction failed; using sentinel");
                None
            }
        };

        Ok(AggregatedRecord {
            location,
            coordinates: coords,
            current,
            air_quality,
            sun,
            hourly,
            daily,
            next_hour_prediction,
            generated_at: now,
        })
    }

    async fn fetch(
        &self,
        coords: Coordinates,
        kind: ObservationKind,
    ) -> Result<RawObservation, UpstreamError> {
        let deadline = self.options.provider_timeout;
        match tokio::time::timeout(deadline, self.client.fetch(coords, kind)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Unavailable {
                kind,
                reason: format!("no response within {deadline:?}"),
            }),
        }
    }
}

/// Build the production pipeline: HTTP upstream client, model loaded from
/// `config.model_path`, built-in plus configured cities.
pub fn aggregator_from_config(config: &Config) -> anyhow::Result<Aggregator> {
    let client = HttpUpstreamClient::new(
        config.endpoints.clone(),
        config.request_timeout(),
        config.retry_policy(),
    )?;

    let model = LinearModel::load(&config.model_path)
        .context("Failed to load the next-hour temperature model")?;
    let predictor = PredictionService::new(Arc::new(model), config.precision);

    Ok(Aggregator::new(
        Arc::new(client),
        predictor,
        config.city_table(),
        config.aggregator_options(),
    ))
}
