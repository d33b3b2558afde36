use camino::Utf8PathBuf;
use chrono::NaiveDate;

use rundash::cache::{load, save};
use rundash::model::{Activity, month_key, round1};

fn sample_rows() -> Vec<Activity> {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();
    vec![Activity {
        id: 101,
        name: "Morning Run".to_string(),
        activity_type: "Run".to_string(),
        date,
        distance_km: 5.0,
        duration_min: 29.95,
        elevation_m: 42.5,
        avg_speed_kmh: 10.0,
        max_speed_kmh: 14.8,
        calories: 320.0,
        kudos: 3,
        polyline: Some("abc123".to_string()),
        pace_min_km: Some(round1(29.95 / 5.03)),
        date_only: date.date(),
        month_year: month_key(&date),
    }]
}

#[test]
fn round_trip_preserves_semantic_fields() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("activities.csv")).unwrap();

    let rows = sample_rows();
    save(&rows, &path).unwrap();
    let reloaded = load(&path);

    assert_eq!(reloaded, rows);
}

#[test]
fn save_overwrites_existing_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("activities.csv")).unwrap();

    save(&sample_rows(), &path).unwrap();
    save(&Vec::new(), &path).unwrap();

    assert!(load(&path).is_empty());
}

#[test]
fn missing_file_is_a_cache_miss() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("nope.csv")).unwrap();
    assert!(load(&path).is_empty());
}

#[test]
fn corrupt_file_is_a_cache_miss() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("activities.csv")).unwrap();
    std::fs::write(path.as_std_path(), "id,name\nnot,a,valid,row,at,all\n").unwrap();
    assert!(load(&path).is_empty());
}

#[test]
fn empty_pace_round_trips_as_none() {
    let mut rows = sample_rows();
    rows[0].pace_min_km = None;
    rows[0].polyline = None;

    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("activities.csv")).unwrap();
    save(&rows, &path).unwrap();
    let reloaded = load(&path);

    assert_eq!(reloaded[0].pace_min_km, None);
    assert_eq!(reloaded[0].polyline, None);
}
