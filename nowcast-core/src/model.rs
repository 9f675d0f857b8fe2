use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

/// Sentinel written for any textual (or whole-value) field that an upstream
/// provider did not deliver.
pub const NOT_AVAILABLE: &str = "N/A";

/// Location label used for requests that did not come from the city table.
pub const CURRENT_LOCATION: &str = "Current Location";

/// Geographic position of a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid coordinates: {reason}")]
pub struct InvalidCoordinates {
    pub reason: String,
}

impl InvalidCoordinates {
    fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        check_range("latitude", latitude, 90.0)?;
        check_range("longitude", longitude, 180.0)?;

        Ok(Self { latitude, longitude })
    }

    /// Parse coordinates from raw request parameters, e.g. the `lat`/`lon`
    /// query string of a live-location request.
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Result<Self, InvalidCoordinates> {
        let latitude = parse_component("latitude", latitude)?;
        let longitude = parse_component("longitude", longitude)?;

        Self::new(latitude, longitude)
    }
}

fn parse_component(name: &str, raw: Option<&str>) -> Result<f64, InvalidCoordinates> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InvalidCoordinates::new(format!("{name} is required")))?;

    raw.parse::<f64>()
        .map_err(|_| InvalidCoordinates::new(format!("{name} '{raw}' is not a number")))
}

fn check_range(name: &str, value: f64, limit: f64) -> Result<(), InvalidCoordinates> {
    if !value.is_finite() {
        return Err(InvalidCoordinates::new(format!("{name} must be finite")));
    }
    if value.abs() > limit {
        return Err(InvalidCoordinates::new(format!(
            "{name} {value} is outside [-{limit}, {limit}]"
        )));
    }
    Ok(())
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert a WMO weather code. Unknown codes have no category.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Option<Self> {
        let condition = match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet, // freezing drizzle / rain
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => return None,
        };
        Some(condition)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Normalized current conditions.
///
/// Measurements stay optional so the feature encoder can apply the model's
/// own defaults. When serialized, a missing measurement is written as `0`
/// and a missing code or condition as `"N/A"`, since code `0` is clear sky.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    /// Air temperature, °C.
    #[serde(serialize_with = "or_zero")]
    pub temperature: Option<f64>,
    /// Apparent temperature, °C.
    #[serde(serialize_with = "or_zero")]
    pub feels_like: Option<f64>,
    /// Relative humidity, %.
    #[serde(serialize_with = "or_zero")]
    pub humidity: Option<f64>,
    /// Wind speed, km/h.
    #[serde(serialize_with = "or_zero")]
    pub wind_speed: Option<f64>,
    /// Wind direction, degrees.
    #[serde(serialize_with = "or_zero")]
    pub wind_bearing: Option<f64>,
    /// Visibility, km.
    #[serde(serialize_with = "or_zero")]
    pub visibility: Option<f64>,
    /// Cloud cover, %.
    #[serde(serialize_with = "or_zero")]
    pub cloud_cover: Option<f64>,
    /// Mean sea level pressure, hPa.
    #[serde(serialize_with = "or_zero")]
    pub pressure: Option<f64>,
    /// Rain over the preceding hour, mm.
    #[serde(serialize_with = "or_zero")]
    pub rain: Option<f64>,
    /// WMO weather code.
    #[serde(serialize_with = "or_na")]
    pub weather_code: Option<i32>,
    #[serde(serialize_with = "condition_or_na")]
    pub condition: Option<WeatherCondition>,
}

/// Sunrise/sunset strings as reported by the provider (local time).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SunTimes {
    #[serde(serialize_with = "or_na")]
    pub sunrise: Option<String>,
    #[serde(serialize_with = "or_na")]
    pub sunset: Option<String>,
    #[serde(serialize_with = "or_na")]
    pub day_length: Option<String>,
}

/// One hour of the hourly outlook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyEntry {
    pub label: String,
    #[serde(serialize_with = "or_zero")]
    pub temperature: Option<f64>,
    #[serde(serialize_with = "or_na")]
    pub code: Option<i32>,
}

/// One day of the daily outlook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyEntry {
    pub label: String,
    #[serde(serialize_with = "or_zero")]
    pub low: Option<f64>,
    #[serde(serialize_with = "or_zero")]
    pub high: Option<f64>,
    #[serde(serialize_with = "or_na")]
    pub code: Option<i32>,
}

/// Everything known about one location for one request.
///
/// Every field is always present; partial upstream failures show up as
/// sentinel values, never as missing sub-objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecord {
    pub location: String,
    pub coordinates: Coordinates,
    pub current: WeatherSnapshot,
    /// US AQI.
    #[serde(serialize_with = "or_na")]
    pub air_quality: Option<f64>,
    pub sun: SunTimes,
    pub hourly: Vec<HourlyEntry>,
    pub daily: Vec<DailyEntry>,
    /// Predicted temperature one hour ahead, °C.
    #[serde(serialize_with = "or_na")]
    pub next_hour_prediction: Option<f64>,
    pub generated_at: NaiveDateTime,
}

fn or_zero<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Default + Copy,
    S: Serializer,
{
    value.unwrap_or_default().serialize(serializer)
}

fn or_na<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(NOT_AVAILABLE),
    }
}

fn condition_or_na<S: Serializer>(
    value: &Option<WeatherCondition>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.map_or(NOT_AVAILABLE, |c| c.description()))
}
