use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use crate::model::{Activity, month_key, round1};
use crate::strava::RawActivity;

const MS_TO_KMH: f64 = 3.6;

/// One candidate source for a numeric target field: the upstream key to
/// probe and the factor that brings its value into the target unit.
struct NumberSource {
    key: &'static str,
    scale: f64,
}

/// The upstream payload and the cached CSV spell columns differently, so
/// every target field resolves through an ordered candidate list; the first
/// present, coercible key wins.
const DATE_KEYS: [&str; 3] = ["date", "start_date", "start_date_local"];

const TYPE_KEYS: [&str; 3] = ["type", "sport_type", "activity_type"];

const DISTANCE_KM_SOURCES: [NumberSource; 2] = [
    NumberSource {
        key: "distance_km",
        scale: 1.0,
    },
    NumberSource {
        key: "distance",
        scale: 1.0 / 1000.0,
    },
];

const DURATION_MIN_SOURCES: [NumberSource; 4] = [
    NumberSource {
        key: "duration_min",
        scale: 1.0,
    },
    NumberSource {
        key: "moving_time",
        scale: 1.0 / 60.0,
    },
    NumberSource {
        key: "elapsed_time",
        scale: 1.0 / 60.0,
    },
    NumberSource {
        key: "duration",
        scale: 1.0 / 60.0,
    },
];

const ELEVATION_M_SOURCES: [NumberSource; 2] = [
    NumberSource {
        key: "elevation_m",
        scale: 1.0,
    },
    NumberSource {
        key: "total_elevation_gain",
        scale: 1.0,
    },
];

const AVG_SPEED_KMH_SOURCES: [NumberSource; 2] = [
    NumberSource {
        key: "avg_speed_kmh",
        scale: 1.0,
    },
    NumberSource {
        key: "average_speed",
        scale: MS_TO_KMH,
    },
];

const MAX_SPEED_KMH_SOURCES: [NumberSource; 2] = [
    NumberSource {
        key: "max_speed_kmh",
        scale: 1.0,
    },
    NumberSource {
        key: "max_speed",
        scale: MS_TO_KMH,
    },
];

const CALORIES_SOURCES: [NumberSource; 1] = [NumberSource {
    key: "calories",
    scale: 1.0,
}];

const KUDOS_SOURCES: [NumberSource; 2] = [
    NumberSource {
        key: "kudos",
        scale: 1.0,
    },
    NumberSource {
        key: "kudos_count",
        scale: 1.0,
    },
];

const ID_SOURCES: [NumberSource; 1] = [NumberSource {
    key: "id",
    scale: 1.0,
}];

/// Why a raw record was excluded from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    MissingDate,
    NonPositiveDistance,
    NonPositiveDuration,
}

/// Per-reason tally of dropped records, reported alongside the table so
/// callers can surface data-quality problems instead of losing rows silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DropTally {
    pub missing_date: usize,
    pub non_positive_distance: usize,
    pub non_positive_duration: usize,
}

impl DropTally {
    pub fn total(&self) -> usize {
        self.missing_date + self.non_positive_distance + self.non_positive_duration
    }

    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingDate => self.missing_date += 1,
            DropReason::NonPositiveDistance => self.non_positive_distance += 1,
            DropReason::NonPositiveDuration => self.non_positive_duration += 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub rows: Vec<Activity>,
    pub dropped: DropTally,
}

/// Maps raw records into the canonical table. Pure: the same input always
/// yields the identical output. Records without a parseable date or with a
/// non-positive distance/duration are excluded and tallied.
pub fn normalize(raw: &[RawActivity]) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    for record in raw {
        match normalize_record(record) {
            Ok(activity) => outcome.rows.push(activity),
            Err(reason) => outcome.dropped.record(reason),
        }
    }
    if outcome.dropped.total() > 0 {
        debug!(
            kept = outcome.rows.len(),
            dropped = outcome.dropped.total(),
            "normalization excluded records"
        );
    }
    outcome
}

fn normalize_record(record: &RawActivity) -> Result<Activity, DropReason> {
    let date = resolve_date(record).ok_or(DropReason::MissingDate)?;

    let distance_km = resolve_number(record, &DISTANCE_KM_SOURCES).unwrap_or(0.0);
    if distance_km <= 0.0 {
        return Err(DropReason::NonPositiveDistance);
    }
    let duration_min = resolve_number(record, &DURATION_MIN_SOURCES).unwrap_or(0.0);
    if duration_min <= 0.0 {
        return Err(DropReason::NonPositiveDuration);
    }

    // Pace comes from the unrounded values; rounding is display-only.
    let pace_min_km = Some(round1(duration_min / distance_km));

    Ok(Activity {
        id: resolve_number(record, &ID_SOURCES).unwrap_or(0.0) as u64,
        name: resolve_string(record, &["name"]).unwrap_or_default(),
        activity_type: resolve_string(record, &TYPE_KEYS)
            .unwrap_or_else(|| "Unknown".to_string()),
        date,
        distance_km: round1(distance_km),
        duration_min,
        elevation_m: optional_metric(record, &ELEVATION_M_SOURCES),
        avg_speed_kmh: optional_metric(record, &AVG_SPEED_KMH_SOURCES),
        max_speed_kmh: optional_metric(record, &MAX_SPEED_KMH_SOURCES),
        calories: optional_metric(record, &CALORIES_SOURCES),
        kudos: optional_metric(record, &KUDOS_SOURCES) as u64,
        polyline: resolve_polyline(record),
        pace_min_km,
        date_only: date.date(),
        month_year: month_key(&date),
    })
}

/// First present and coercible candidate wins; absent and non-numeric values
/// both resolve to `None` so the caller chooses between defaulting and
/// exclusion.
fn resolve_number(record: &RawActivity, sources: &[NumberSource]) -> Option<f64> {
    sources.iter().find_map(|source| {
        record
            .get(source.key)
            .and_then(coerce_number)
            .map(|value| value * source.scale)
    })
}

/// Optional metrics fall back to 0 instead of excluding the row.
fn optional_metric(record: &RawActivity, sources: &[NumberSource]) -> f64 {
    resolve_number(record, sources).unwrap_or(0.0).max(0.0)
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn resolve_string(record: &RawActivity, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        record
            .get(*key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|text| !text.is_empty())
    })
}

fn resolve_date(record: &RawActivity) -> Option<NaiveDateTime> {
    DATE_KEYS.iter().find_map(|key| {
        record
            .get(*key)
            .and_then(Value::as_str)
            .and_then(parse_datetime)
    })
}

/// Upstream timestamps end in `Z` or a numeric offset, the cached CSV
/// stores naive timestamps. All parse to timezone-naive local time.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|at| at.naive_local())
        })
}

/// The API nests the route polyline under `map.summary_polyline`; the cached
/// CSV stores it flat.
fn resolve_polyline(record: &RawActivity) -> Option<String> {
    let flat = record
        .get("polyline")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    flat.or_else(|| {
        record
            .get("map")
            .and_then(|map| map.get("summary_polyline"))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: serde_json::Value) -> RawActivity {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn meters_and_seconds_convert() {
        let record = raw(json!({
            "distance": 5000,
            "moving_time": 1800,
            "start_date": "2024-01-01T06:00:00"
        }));
        let outcome = normalize(&[record]);
        let row = &outcome.rows[0];
        assert_eq!(row.distance_km, 5.0);
        assert_eq!(row.duration_min, 30.0);
        assert_eq!(row.pace_min_km, Some(6.0));
        assert_eq!(row.month_year, "2024-01");
    }

    #[test]
    fn csv_shaped_record_resolves_verbatim() {
        let record = raw(json!({
            "date": "2024-02-10T07:15:00",
            "distance_km": 10.0,
            "duration_min": 55.0,
            "type": "Run"
        }));
        let outcome = normalize(&[record]);
        assert_eq!(outcome.rows[0].distance_km, 10.0);
        assert_eq!(outcome.rows[0].duration_min, 55.0);
        assert_eq!(outcome.rows[0].activity_type, "Run");
    }

    #[test]
    fn missing_duration_excludes_row() {
        let record = raw(json!({
            "distance": 5000,
            "start_date": "2024-01-01T06:00:00"
        }));
        let outcome = normalize(&[record]);
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.dropped.non_positive_duration, 1);
    }

    #[test]
    fn unparseable_date_excludes_row() {
        let record = raw(json!({
            "distance": 5000,
            "moving_time": 1800,
            "start_date": "not a date"
        }));
        let outcome = normalize(&[record]);
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.dropped.missing_date, 1);
    }

    #[test]
    fn offset_timestamp_parses() {
        let record = raw(json!({
            "distance": 5000,
            "moving_time": 1800,
            "start_date": "2024-01-01T06:00:00+02:00"
        }));
        let outcome = normalize(&[record]);
        assert_eq!(outcome.rows[0].date.to_string(), "2024-01-01 06:00:00");
    }

    #[test]
    fn string_numbers_coerce() {
        let record = raw(json!({
            "distance": "5000",
            "moving_time": "1800",
            "start_date": "2024-01-01T06:00:00Z",
            "kudos_count": 7
        }));
        let outcome = normalize(&[record]);
        assert_eq!(outcome.rows[0].distance_km, 5.0);
        assert_eq!(outcome.rows[0].kudos, 7);
    }

    #[test]
    fn nested_polyline_resolves() {
        let record = raw(json!({
            "distance": 3000,
            "moving_time": 900,
            "start_date": "2024-01-01T06:00:00Z",
            "map": { "summary_polyline": "abc123" }
        }));
        let outcome = normalize(&[record]);
        assert_eq!(outcome.rows[0].polyline.as_deref(), Some("abc123"));
    }
}
