use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One normalized activity row. Built once by the normalizer and never
/// mutated afterwards; downstream consumers work on filtered copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub date: NaiveDateTime,
    pub distance_km: f64,
    pub duration_min: f64,
    pub elevation_m: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub calories: f64,
    pub kudos: u64,
    pub polyline: Option<String>,
    pub pace_min_km: Option<f64>,
    pub date_only: NaiveDate,
    pub month_year: String,
}

/// Fixed distance taxonomy used by the category-pace aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceCategory {
    Light,
    Short,
    Medium,
    HalfMarathonPlus,
}

impl DistanceCategory {
    pub fn for_distance_km(distance_km: f64) -> Self {
        if distance_km < 5.0 {
            DistanceCategory::Light
        } else if distance_km < 10.0 {
            DistanceCategory::Short
        } else if distance_km < 21.0 {
            DistanceCategory::Medium
        } else {
            DistanceCategory::HalfMarathonPlus
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DistanceCategory::Light => "light (< 5 km)",
            DistanceCategory::Short => "short (5-10 km)",
            DistanceCategory::Medium => "medium (10-21 km)",
            DistanceCategory::HalfMarathonPlus => "half-marathon+ (>= 21 km)",
        }
    }
}

impl fmt::Display for DistanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Round to one decimal place, ties to even. Cosmetic only: derived metrics
/// are computed from unrounded values before this is applied.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Calendar-month bucket key, e.g. "2024-03".
pub fn month_key(date: &NaiveDateTime) -> String {
    date.format("%Y-%m").to_string()
}
