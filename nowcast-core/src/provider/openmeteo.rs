//! Open-Meteo forecast and air-quality payloads.
//!
//! See https://open-meteo.com/en/docs and
//! https://open-meteo.com/en/docs/air-quality-api

use serde::Deserialize;

use crate::{
    model::{Coordinates, WeatherCondition, WeatherSnapshot},
    outlook::{DAILY_LEN, DailyPoint, HOURLY_LEN, HourlyPoint},
};

use super::{ObservationKind, RawObservation, lenient, parse_payload};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";

const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,rain,\
wind_speed_10m,wind_direction_10m,visibility,cloud_cover,pressure_msl,weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,weather_code";

pub fn forecast_query(coords: Coordinates) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coords.latitude.to_string()),
        ("longitude", coords.longitude.to_string()),
        ("current", CURRENT_FIELDS.to_string()),
        ("hourly", HOURLY_FIELDS.to_string()),
        ("daily", DAILY_FIELDS.to_string()),
        ("forecast_hours", HOURLY_LEN.to_string()),
        ("forecast_days", DAILY_LEN.to_string()),
        ("timezone", "auto".to_string()),
    ]
}

pub fn air_quality_query(coords: Coordinates) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coords.latitude.to_string()),
        ("longitude", coords.longitude.to_string()),
        ("current", "us_aqi".to_string()),
    ]
}

#[derive(Debug, Default, Deserialize)]
struct ForecastResponse {
    #[serde(default, deserialize_with = "lenient::block")]
    current: CurrentBlock,
    #[serde(default, deserialize_with = "lenient::block")]
    hourly: HourlyBlock,
    #[serde(default, deserialize_with = "lenient::block")]
    daily: DailyBlock,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentBlock {
    #[serde(default, deserialize_with = "lenient::number")]
    temperature_2m: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    apparent_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    relative_humidity_2m: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    rain: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    wind_speed_10m: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    wind_direction_10m: Option<f64>,
    /// Meters.
    #[serde(default, deserialize_with = "lenient::number")]
    visibility: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    cloud_cover: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pressure_msl: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    weather_code: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default, deserialize_with = "lenient::texts")]
    time: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::numbers")]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::numbers")]
    weather_code: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct DailyBlock {
    #[serde(default, deserialize_with = "lenient::texts")]
    time: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::numbers")]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::numbers")]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::numbers")]
    weather_code: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AirQualityResponse {
    #[serde(default, deserialize_with = "lenient::block")]
    current: AirQualityBlock,
}

#[derive(Debug, Default, Deserialize)]
struct AirQualityBlock {
    #[serde(default, deserialize_with = "lenient::number")]
    us_aqi: Option<f64>,
}

fn forecast(raw: &RawObservation) -> ForecastResponse {
    parse_payload(raw, ObservationKind::CurrentWeather)
}

/// Current conditions from a forecast payload. Missing or non-numeric
/// fields stay `None`.
pub fn extract_snapshot(raw: &RawObservation) -> WeatherSnapshot {
    let current = forecast(raw).current;
    let weather_code = current.weather_code.and_then(to_code);

    WeatherSnapshot {
        temperature: current.temperature_2m,
        feels_like: current.apparent_temperature,
        humidity: current.relative_humidity_2m,
        wind_speed: current.wind_speed_10m,
        wind_bearing: current.wind_direction_10m,
        visibility: current.visibility.map(|m| m / 1000.0),
        cloud_cover: current.cloud_cover,
        pressure: current.pressure_msl,
        rain: current.rain,
        weather_code,
        condition: weather_code.and_then(WeatherCondition::from_wmo_code),
    }
}

pub fn extract_hourly(raw: &RawObservation) -> Vec<HourlyPoint> {
    let hourly = forecast(raw).hourly;

    let len = hourly.time.len().max(hourly.temperature_2m.len()).max(hourly.weather_code.len());
    (0..len)
        .map(|i| HourlyPoint {
            time: at(&hourly.time, i),
            temperature: at(&hourly.temperature_2m, i),
            code: at(&hourly.weather_code, i).and_then(to_code),
        })
        .collect()
}

pub fn extract_daily(raw: &RawObservation) -> Vec<DailyPoint> {
    let daily = forecast(raw).daily;

    let len = daily
        .time
        .len()
        .max(daily.temperature_2m_max.len())
        .max(daily.temperature_2m_min.len())
        .max(daily.weather_code.len());
    (0..len)
        .map(|i| DailyPoint {
            date: at(&daily.time, i),
            low: at(&daily.temperature_2m_min, i),
            high: at(&daily.temperature_2m_max, i),
            code: at(&daily.weather_code, i).and_then(to_code),
        })
        .collect()
}

/// Current US AQI from an air-quality payload.
pub fn extract_air_quality(raw: &RawObservation) -> Option<f64> {
    parse_payload::<AirQualityResponse>(raw, ObservationKind::AirQuality)
        .current
        .us_aqi
}

fn at<T: Clone>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).cloned().flatten()
}

fn to_code(value: f64) -> Option<i32> {
    let in_range = (0.0..=f64::from(i32::MAX)).contains(&value);
    (in_range && value.fract() == 0.0).then_some(value as i32)
}
