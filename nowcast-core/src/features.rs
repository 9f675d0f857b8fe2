//! Feature encoding for the next-hour temperature model.
//!
//! The field names, their order and the defaults for missing measurements
//! belong to the trained model's input contract. Changing any of them
//! silently degrades predictions.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::model::WeatherSnapshot;

/// Default for missing continuous measurements.
pub const DEFAULT_MEASUREMENT: f64 = 0.0;
/// Default visibility, km.
pub const DEFAULT_VISIBILITY_KM: f64 = 10.0;
/// Default pressure, millibars.
pub const DEFAULT_PRESSURE_MB: f64 = 1013.0;

pub const MONTH_PERIOD: f64 = 12.0;
pub const HOUR_PERIOD: f64 = 24.0;

/// Model input columns, in training order.
pub const FEATURE_NAMES: [&str; 16] = [
    "Temperature (C)",
    "Apparent Temperature (C)",
    "Humidity",
    "Wind Speed (km/h)",
    "Wind Bearing (degrees)",
    "Visibility (km)",
    "Loud Cover",
    "Pressure (millibars)",
    "year",
    "month",
    "day",
    "hour",
    "month_sin",
    "month_cos",
    "hour_sin",
    "hour_cos",
];

/// Ordered named model inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    fields: Vec<(&'static str, f64)>,
}

impl FeatureVector {
    pub fn from_fields(fields: Vec<(&'static str, f64)>) -> Self {
        Self { fields }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> Vec<f64> {
        self.fields.iter().map(|(_, value)| *value).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Append a field after the existing ones.
    pub fn push(&mut self, name: &'static str, value: f64) {
        self.fields.push((name, value));
    }
}

/// `(sin, cos)` of `value` on a circle with the given period.
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, snapshot: &WeatherSnapshot, timestamp: NaiveDateTime) -> FeatureVector {
        let measured = |value: Option<f64>| value.unwrap_or(DEFAULT_MEASUREMENT);

        let temperature = measured(snapshot.temperature);
        let apparent = snapshot.feels_like.unwrap_or(temperature);

        let month = f64::from(timestamp.month());
        let hour = f64::from(timestamp.hour());
        let (month_sin, month_cos) = cyclical(month, MONTH_PERIOD);
        let (hour_sin, hour_cos) = cyclical(hour, HOUR_PERIOD);

        let values = [
            temperature,
            apparent,
            measured(snapshot.humidity),
            measured(snapshot.wind_speed),
            measured(snapshot.wind_bearing),
            snapshot.visibility.unwrap_or(DEFAULT_VISIBILITY_KM),
            measured(snapshot.cloud_cover),
            snapshot.pressure.unwrap_or(DEFAULT_PRESSURE_MB),
            f64::from(timestamp.year()),
            month,
            f64::from(timestamp.day()),
            hour,
            month_sin,
            month_cos,
            hour_sin,
            hour_cos,
        ];

        FeatureVector::from_fields(FEATURE_NAMES.into_iter().zip(values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-12;

    fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, 30, 0))
            .unwrap()
    }

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: Some(20.0),
            feels_like: Some(19.0),
            humidity: Some(50.0),
            wind_speed: Some(10.0),
            wind_bearing: Some(180.0),
            visibility: Some(16.1),
            cloud_cover: Some(25.0),
            pressure: Some(1009.0),
            ..WeatherSnapshot::default()
        }
    }

    #[test]
    fn field_order_matches_contract() {
        let vector = FeatureEncoder::new().encode(&snapshot(), at(2026, 10, 16, 14));
        let names: Vec<_> = vector.names().collect();
        assert_eq!(names, FEATURE_NAMES);
    }

    #[test]
    fn hour_zero_encodes_to_unit_x_axis() {
        let vector = FeatureEncoder::new().encode(&snapshot(), at(2026, 3, 1, 0));

        assert_eq!(vector.get("hour_sin"), Some(0.0));
        assert_eq!(vector.get("hour_cos"), Some(1.0));
    }

    #[test]
    fn month_twelve_wraps_to_month_zero() {
        let (sin12, cos12) = cyclical(12.0, MONTH_PERIOD);
        let (sin0, cos0) = cyclical(0.0, MONTH_PERIOD);
        assert!((sin12 - sin0).abs() < EPS);
        assert!((cos12 - cos0).abs() < EPS);

        // December sits next to January on the circle.
        let (sin1, cos1) = cyclical(1.0, MONTH_PERIOD);
        let (sin11, cos11) = cyclical(11.0, MONTH_PERIOD);
        assert!((sin1 + sin11).abs() < EPS);
        assert!((cos1 - cos11).abs() < EPS);
    }

    #[test]
    fn quarter_period_values() {
        let (s, c) = cyclical(6.0, HOUR_PERIOD);
        assert!((s - 1.0).abs() < EPS);
        assert!(c.abs() < EPS);

        let (s, c) = cyclical(6.0, MONTH_PERIOD);
        assert!(s.abs() < EPS);
        assert!((c + 1.0).abs() < EPS);
    }

    #[test]
    fn calendar_fields_come_from_timestamp() {
        let vector = FeatureEncoder::new().encode(&snapshot(), at(2026, 10, 16, 14));

        assert_eq!(vector.get("year"), Some(2026.0));
        assert_eq!(vector.get("month"), Some(10.0));
        assert_eq!(vector.get("day"), Some(16.0));
        assert_eq!(vector.get("hour"), Some(14.0));
    }

    #[test]
    fn missing_measurements_use_model_defaults() {
        let vector = FeatureEncoder::new().encode(&WeatherSnapshot::default(), at(2026, 1, 1, 9));

        assert_eq!(vector.get("Temperature (C)"), Some(DEFAULT_MEASUREMENT));
        assert_eq!(vector.get("Apparent Temperature (C)"), Some(DEFAULT_MEASUREMENT));
        assert_eq!(vector.get("Humidity"), Some(DEFAULT_MEASUREMENT));
        assert_eq!(vector.get("Visibility (km)"), Some(DEFAULT_VISIBILITY_KM));
        assert_eq!(vector.get("Pressure (millibars)"), Some(DEFAULT_PRESSURE_MB));
        assert_eq!(vector.get("Loud Cover"), Some(DEFAULT_MEASUREMENT));
    }

    #[test]
    fn apparent_temperature_falls_back_to_temperature() {
        let snap = WeatherSnapshot {
            temperature: Some(7.5),
            ..WeatherSnapshot::default()
        };
        let vector = FeatureEncoder::new().encode(&snap, at(2026, 1, 1, 9));
        assert_eq!(vector.get("Apparent Temperature (C)"), Some(7.5));
    }

    #[test]
    fn encoding_is_bit_identical_across_calls() {
        let encoder = FeatureEncoder::new();
        let ts = at(2026, 12, 31, 23);

        let a = encoder.encode(&snapshot(), ts);
        let b = encoder.encode(&snapshot(), ts);

        let bits = |v: &FeatureVector| v.values().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }
}
