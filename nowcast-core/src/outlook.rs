//! Fixed-length hourly and daily outlooks.
//!
//! Upstream arrays are mapped position by position, then truncated or padded
//! so consumers always see `HOURLY_LEN` hours and `DAILY_LEN` days.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::{DailyEntry, HourlyEntry, NOT_AVAILABLE};

pub const HOURLY_LEN: usize = 24;
pub const DAILY_LEN: usize = 7;

/// One position of the provider's hourly arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyPoint {
    pub time: Option<String>,
    pub temperature: Option<f64>,
    pub code: Option<i32>,
}

/// One position of the provider's daily arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyPoint {
    pub date: Option<String>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub code: Option<i32>,
}

pub fn hourly_outlook(points: &[HourlyPoint]) -> Vec<HourlyEntry> {
    fixed_length(points, HOURLY_LEN, |point| HourlyEntry {
        label: label_or_na(point.time.as_deref(), hour_label),
        temperature: point.temperature,
        code: point.code,
    })
}

pub fn daily_outlook(points: &[DailyPoint]) -> Vec<DailyEntry> {
    fixed_length(points, DAILY_LEN, |point| DailyEntry {
        label: label_or_na(point.date.as_deref(), day_label),
        low: point.low,
        high: point.high,
        code: point.code,
    })
}

fn fixed_length<P, E>(points: &[P], len: usize, to_entry: impl Fn(&P) -> E) -> Vec<E>
where
    P: Default,
{
    let padding = P::default();
    (0..len)
        .map(|i| to_entry(points.get(i).unwrap_or(&padding)))
        .collect()
}

fn label_or_na(raw: Option<&str>, format: fn(&str) -> Option<String>) -> String {
    match raw {
        Some(raw) => format(raw).unwrap_or_else(|| raw.to_string()),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `2026-10-16T14:00` -> `14:00`
fn hour_label(raw: &str) -> Option<String> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|t| t.format("%H:%M").to_string())
}

/// `2026-10-16` -> `Fri`
fn day_label(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%a").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly_points(n: usize) -> Vec<HourlyPoint> {
        (0..n)
            .map(|i| HourlyPoint {
                time: Some(format!("2026-10-{:02}T{:02}:00", 16 + i / 24, i % 24)),
                temperature: Some(10.0 + i as f64),
                code: Some(1),
            })
            .collect()
    }

    fn daily_points(n: usize) -> Vec<DailyPoint> {
        (0..n)
            .map(|i| DailyPoint {
                date: Some(format!("2026-10-{:02}", 16 + i)),
                low: Some(5.0),
                high: Some(15.0 + i as f64),
                code: Some(3),
            })
            .collect()
    }

    #[test]
    fn short_hourly_input_is_padded() {
        let out = hourly_outlook(&hourly_points(10));

        assert_eq!(out.len(), HOURLY_LEN);
        assert_eq!(out[0].label, "00:00");
        assert_eq!(out[9].temperature, Some(19.0));
        assert_eq!(out[10].label, NOT_AVAILABLE);
        assert_eq!(out[10].temperature, None);
        assert_eq!(out[23].code, None);
    }

    #[test]
    fn long_hourly_input_is_truncated() {
        let out = hourly_outlook(&hourly_points(30));

        assert_eq!(out.len(), HOURLY_LEN);
        assert_eq!(out[23].label, "23:00");
        assert_eq!(out[23].temperature, Some(33.0));
    }

    #[test]
    fn daily_length_is_fixed() {
        assert_eq!(daily_outlook(&daily_points(10)).len(), DAILY_LEN);
        assert_eq!(daily_outlook(&daily_points(30)).len(), DAILY_LEN);
        assert_eq!(daily_outlook(&daily_points(3)).len(), DAILY_LEN);
        assert_eq!(daily_outlook(&[]).len(), DAILY_LEN);
    }

    #[test]
    fn daily_labels_are_weekdays() {
        let out = daily_outlook(&daily_points(2));

        // 2026-10-16 is a Friday
        assert_eq!(out[0].label, "Fri");
        assert_eq!(out[1].label, "Sat");
        assert_eq!(out[1].high, Some(16.0));
        assert_eq!(out[6].label, NOT_AVAILABLE);
    }

    #[test]
    fn unparseable_time_is_kept_verbatim() {
        let points = vec![HourlyPoint {
            time: Some("soon".into()),
            ..HourlyPoint::default()
        }];
        assert_eq!(hourly_outlook(&points)[0].label, "soon");
    }
}
