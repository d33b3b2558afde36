use serde_json::json;

use rundash::normalize::normalize;
use rundash::strava::RawActivity;

fn raw(value: serde_json::Value) -> RawActivity {
    value.as_object().unwrap().clone()
}

fn sample_batch() -> Vec<RawActivity> {
    vec![
        raw(json!({
            "id": 101,
            "name": "Morning Run",
            "type": "Run",
            "distance": 5000,
            "moving_time": 1800,
            "total_elevation_gain": 42.5,
            "average_speed": 2.78,
            "max_speed": 4.1,
            "kudos_count": 3,
            "start_date_local": "2024-01-01T06:00:00Z"
        })),
        raw(json!({
            "id": 102,
            "name": "Evening Ride",
            "sport_type": "Ride",
            "distance": 20000,
            "elapsed_time": 3600,
            "start_date": "2024-01-02T18:30:00Z"
        })),
        // CSV-shaped record: already-normalized column names.
        raw(json!({
            "id": 103,
            "name": "Cached Run",
            "type": "Run",
            "date": "2024-02-03T07:00:00",
            "distance_km": 10.0,
            "duration_min": 55.0
        })),
        // No duration at all: excluded.
        raw(json!({
            "id": 104,
            "distance": 3000,
            "start_date": "2024-02-04T07:00:00Z"
        })),
        // No usable date: excluded.
        raw(json!({
            "id": 105,
            "distance": 3000,
            "moving_time": 900
        })),
    ]
}

#[test]
fn unit_conversions_and_derivations() {
    let outcome = normalize(&sample_batch());
    let run = &outcome.rows[0];

    assert_eq!(run.distance_km, 5.0);
    assert_eq!(run.duration_min, 30.0);
    assert_eq!(run.pace_min_km, Some(6.0));
    assert_eq!(run.elevation_m, 42.5);
    assert!((run.avg_speed_kmh - 10.008).abs() < 1e-9);
    assert_eq!(run.kudos, 3);
    assert_eq!(run.date_only.to_string(), "2024-01-01");
    assert_eq!(run.month_year, "2024-01");
}

#[test]
fn alternate_schema_keys_resolve() {
    let outcome = normalize(&sample_batch());
    let ride = &outcome.rows[1];
    assert_eq!(ride.activity_type, "Ride");
    assert_eq!(ride.distance_km, 20.0);
    assert_eq!(ride.duration_min, 60.0);

    let cached = &outcome.rows[2];
    assert_eq!(cached.distance_km, 10.0);
    assert_eq!(cached.duration_min, 55.0);
    assert_eq!(cached.month_year, "2024-02");
}

#[test]
fn invalid_records_are_dropped_and_tallied() {
    let outcome = normalize(&sample_batch());
    assert_eq!(outcome.rows.len(), 3);
    assert_eq!(outcome.dropped.non_positive_duration, 1);
    assert_eq!(outcome.dropped.missing_date, 1);
    assert_eq!(outcome.dropped.total(), 2);
}

#[test]
fn normalization_is_deterministic() {
    let batch = sample_batch();
    let first = normalize(&batch);
    let second = normalize(&batch);
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.dropped, second.dropped);
}

#[test]
fn zero_distance_never_divides() {
    let outcome = normalize(&[raw(json!({
        "distance": 0,
        "moving_time": 1800,
        "start_date": "2024-01-01T06:00:00Z"
    }))]);
    // Non-positive distance excludes the row, so no pace is ever computed
    // from a zero denominator.
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.dropped.non_positive_distance, 1);
}

#[test]
fn pace_rounds_to_one_decimal_from_unrounded_inputs() {
    // 29:57 over 5.03 km: pace from the raw values, not the rounded ones.
    let outcome = normalize(&[raw(json!({
        "distance": 5030,
        "moving_time": 1797,
        "start_date": "2024-01-01T06:00:00Z"
    }))]);
    let row = &outcome.rows[0];
    assert_eq!(row.distance_km, 5.0);
    let expected = ((1797.0_f64 / 60.0) / 5.03 * 10.0).round_ties_even() / 10.0;
    assert_eq!(row.pace_min_km, Some(expected));
}
