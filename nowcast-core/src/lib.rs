//! Core library for the `nowcast` pipeline.
//!
//! This crate defines:
//! - Upstream clients for weather, air-quality and sunrise/sunset providers
//! - Feature encoding and next-hour temperature prediction
//! - Aggregation of all partial results into one record per location
//! - Configuration handling
//!
//! It is used by `nowcast-cli`, but the `Aggregator` is equally usable
//! behind an HTTP handler.

pub mod aggregate;
pub mod city;
pub mod config;
pub mod features;
pub mod model;
pub mod outlook;
pub mod predict;
pub mod provider;
pub mod retry;

pub use aggregate::{AggregateError, Aggregator, AggregatorOptions, aggregator_from_config};
pub use city::{City, CityTable};
pub use config::Config;
pub use features::{FeatureEncoder, FeatureVector};
pub use model::{AggregatedRecord, Coordinates, InvalidCoordinates, WeatherSnapshot};
pub use predict::{LinearModel, PredictError, PredictionService, RegressionModel};
pub use provider::{HttpUpstreamClient, ObservationKind, UpstreamClient, UpstreamError};
