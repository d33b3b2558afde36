//! Pure, side-effect-free helpers over the normalized table. The chart
//! layer consumes these as-is; every function returns an empty result for
//! empty input instead of failing.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::model::{Activity, DistanceCategory, round1};

/// Smoothing window as a fraction of the point count, matching the usual
/// LOWESS default.
const LOWESS_FRACTION: f64 = 0.67;
/// Below this many points the overlay is omitted rather than fitted.
const LOWESS_MIN_POINTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub date: NaiveDateTime,
    pub total_km: f64,
}

/// Running distance total in date order.
pub fn cumulative_distance(rows: &[Activity]) -> Vec<CumulativePoint> {
    let mut sorted: Vec<&Activity> = rows.iter().collect();
    sorted.sort_by_key(|row| row.date);

    let mut total = 0.0;
    sorted
        .into_iter()
        .map(|row| {
            total += row.distance_km;
            CumulativePoint {
                date: row.date,
                total_km: total,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub count: usize,
}

/// Row count per activity type, most frequent first.
pub fn type_distribution(rows: &[Activity]) -> Vec<TypeCount> {
    let mut counts = HashMap::<&str, usize>::new();
    for row in rows {
        *counts.entry(row.activity_type.as_str()).or_default() += 1;
    }

    let mut distribution: Vec<TypeCount> = counts
        .into_iter()
        .map(|(activity_type, count)| TypeCount {
            activity_type: activity_type.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.activity_type.cmp(&b.activity_type))
    });
    distribution
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacePoint {
    pub date: NaiveDateTime,
    pub pace_min_km: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PaceTrend {
    pub points: Vec<PacePoint>,
    /// LOWESS overlay aligned with `points`; absent when there are too few
    /// points to fit — the chart then shows raw points only.
    pub trend: Option<Vec<f64>>,
}

/// Date-ordered pace observations for rows with a defined pace, plus an
/// optional smoothed overlay.
pub fn pace_trend(rows: &[Activity]) -> PaceTrend {
    let mut points: Vec<PacePoint> = rows
        .iter()
        .filter(|row| row.distance_km > 0.0)
        .filter_map(|row| {
            row.pace_min_km.map(|pace| PacePoint {
                date: row.date,
                pace_min_km: pace,
            })
        })
        .collect();
    points.sort_by_key(|point| point.date);

    let trend = if points.len() >= LOWESS_MIN_POINTS {
        let xs: Vec<f64> = points
            .iter()
            .map(|point| point.date.and_utc().timestamp() as f64)
            .collect();
        let ys: Vec<f64> = points.iter().map(|point| point.pace_min_km).collect();
        Some(lowess(&xs, &ys, LOWESS_FRACTION))
    } else {
        None
    };

    PaceTrend { points, trend }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub month: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub activities: usize,
}

/// Sum of distance and duration plus row count per `month_year` bucket,
/// ascending by bucket key.
pub fn monthly_stats(rows: &[Activity]) -> Vec<MonthlyStats> {
    let mut buckets = BTreeMap::<&str, (f64, f64, usize)>::new();
    for row in rows {
        let bucket = buckets.entry(row.month_year.as_str()).or_default();
        bucket.0 += row.distance_km;
        bucket.1 += row.duration_min;
        bucket.2 += 1;
    }

    buckets
        .into_iter()
        .map(|(month, (distance_km, duration_min, activities))| MonthlyStats {
            month: month.to_string(),
            distance_km,
            duration_min,
            activities,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPace {
    pub category: DistanceCategory,
    pub mean_pace_min_km: f64,
    pub activities: usize,
}

/// Mean defined pace per distance category, fastest category first. Rows
/// without a pace are excluded from the mean.
pub fn category_pace(rows: &[Activity]) -> Vec<CategoryPace> {
    let mut buckets = HashMap::<DistanceCategory, (f64, usize)>::new();
    for row in rows {
        let Some(pace) = row.pace_min_km else {
            continue;
        };
        let bucket = buckets
            .entry(DistanceCategory::for_distance_km(row.distance_km))
            .or_default();
        bucket.0 += pace;
        bucket.1 += 1;
    }

    let mut paces: Vec<CategoryPace> = buckets
        .into_iter()
        .map(|(category, (sum, count))| CategoryPace {
            category,
            mean_pace_min_km: round1(sum / count as f64),
            activities: count,
        })
        .collect();
    paces.sort_by(|a, b| {
        a.mean_pace_min_km
            .partial_cmp(&b.mean_pace_min_km)
            .unwrap_or(Ordering::Equal)
    });
    paces
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Summary {
    pub total_activities: usize,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
    pub total_elevation_m: f64,
    pub avg_pace_min_km: Option<f64>,
    pub first_date: Option<NaiveDateTime>,
    pub last_date: Option<NaiveDateTime>,
}

/// Headline KPIs over a (possibly filtered) table.
pub fn summary(rows: &[Activity]) -> Summary {
    if rows.is_empty() {
        return Summary::default();
    }

    let paces: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.pace_min_km)
        .filter(|pace| *pace > 0.0)
        .collect();
    let avg_pace_min_km = if paces.is_empty() {
        None
    } else {
        Some(round1(paces.iter().sum::<f64>() / paces.len() as f64))
    };

    Summary {
        total_activities: rows.len(),
        total_distance_km: rows.iter().map(|row| row.distance_km).sum(),
        total_duration_hours: rows.iter().map(|row| row.duration_min).sum::<f64>() / 60.0,
        total_elevation_m: rows.iter().map(|row| row.elevation_m).sum(),
        avg_pace_min_km,
        first_date: rows.iter().map(|row| row.date).min(),
        last_date: rows.iter().map(|row| row.date).max(),
    }
}

/// Calendar filter matching the dashboard's year/month/day selectors. `None`
/// means "all". Returns copies; the input table is never mutated.
pub fn filter_by_period(
    rows: &[Activity],
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
) -> Vec<Activity> {
    rows.iter()
        .filter(|row| year.is_none_or(|y| row.date.year() == y))
        .filter(|row| month.is_none_or(|m| row.date.month() == m))
        .filter(|row| day.is_none_or(|d| row.date.day() == d))
        .cloned()
        .collect()
}

/// Inclusive date-range filter; the end date covers its whole day.
pub fn filter_by_date_range(
    rows: &[Activity],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Activity> {
    let start_at = start.map(|date| date.and_hms_opt(0, 0, 0).unwrap_or_default());
    let end_at = end.and_then(|date| {
        date.and_hms_opt(0, 0, 0)
            .map(|at| at + TimeDelta::days(1) - TimeDelta::seconds(1))
    });

    rows.iter()
        .filter(|row| start_at.is_none_or(|at| row.date >= at))
        .filter(|row| end_at.is_none_or(|at| row.date <= at))
        .cloned()
        .collect()
}

/// Locally-weighted linear regression with tricube weights. For each point,
/// the bandwidth is the distance to its k-th nearest neighbor where k is
/// `frac` of the point count. Degenerate windows fall back to the weighted
/// mean.
fn lowess(xs: &[f64], ys: &[f64], frac: f64) -> Vec<f64> {
    let n = xs.len();
    let k = ((frac * n as f64).ceil() as usize).clamp(2, n);

    let mut fitted = Vec::with_capacity(n);
    for i in 0..n {
        let x0 = xs[i];
        let distances: Vec<f64> = xs.iter().map(|x| (x - x0).abs()).collect();

        let mut sorted = distances.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let bandwidth = sorted[k - 1].max(f64::EPSILON);

        let mut sum_w = 0.0;
        let mut sum_wx = 0.0;
        let mut sum_wy = 0.0;
        let mut sum_wxx = 0.0;
        let mut sum_wxy = 0.0;
        for j in 0..n {
            let d = distances[j] / bandwidth;
            if d >= 1.0 {
                continue;
            }
            let w = (1.0 - d.powi(3)).powi(3);
            sum_w += w;
            sum_wx += w * xs[j];
            sum_wy += w * ys[j];
            sum_wxx += w * xs[j] * xs[j];
            sum_wxy += w * xs[j] * ys[j];
        }

        let denom = sum_w * sum_wxx - sum_wx * sum_wx;
        let value = if denom.abs() > f64::EPSILON && sum_w > 0.0 {
            let slope = (sum_w * sum_wxy - sum_wx * sum_wy) / denom;
            let intercept = (sum_wy - slope * sum_wx) / sum_w;
            intercept + slope * x0
        } else if sum_w > 0.0 {
            sum_wy / sum_w
        } else {
            ys[i]
        };
        fitted.push(value);
    }
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowess_recovers_a_line() {
        let xs: Vec<f64> = (0..20).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        let fitted = lowess(&xs, &ys, 0.67);
        for (fit, expected) in fitted.iter().zip(ys.iter()) {
            assert!((fit - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn lowess_constant_input() {
        let xs: Vec<f64> = (0..10).map(f64::from).collect();
        let ys = vec![5.0; 10];
        let fitted = lowess(&xs, &ys, 0.5);
        for fit in fitted {
            assert!((fit - 5.0).abs() < 1e-9);
        }
    }
}
