//! sunrisesunset.io payloads.

use serde::Deserialize;

use crate::model::{Coordinates, SunTimes};

use super::{ObservationKind, RawObservation, lenient, parse_payload};

pub const SUN_TIMES_URL: &str = "https://api.sunrisesunset.io/json";

pub fn sun_times_query(coords: Coordinates) -> Vec<(&'static str, String)> {
    vec![
        ("lat", coords.latitude.to_string()),
        ("lng", coords.longitude.to_string()),
    ]
}

#[derive(Debug, Default, Deserialize)]
struct SunResponse {
    #[serde(default, deserialize_with = "lenient::text")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient::block")]
    results: SunResults,
}

#[derive(Debug, Default, Deserialize)]
struct SunResults {
    #[serde(default, deserialize_with = "lenient::text")]
    sunrise: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    sunset: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    day_length: Option<String>,
}

/// Sunrise, sunset and day length. A payload whose `status` is present and
/// not `"OK"` carries no usable results.
pub fn extract_sun_times(raw: &RawObservation) -> SunTimes {
    let parsed: SunResponse = parse_payload(raw, ObservationKind::SunTimes);
    if parsed.status.is_some_and(|status| status != "OK") {
        return SunTimes::default();
    }

    SunTimes {
        sunrise: parsed.results.sunrise,
        sunset: parsed.results.sunset,
        day_length: parsed.results.day_length,
    }
}
