use anyhow::Result;
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::Serialize;
use sqlx::PgPool;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageSnapshot {
    pub id: i64,
    pub measured_at: DateTime<Utc>,
    pub used_bytes: i64,
    pub total_bytes: i64,
}

impl StorageSnapshot {
    /// Current on-disk size of the connected database.
    pub async fn database_size(pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT pg_database_size(current_database())")
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn record(used_bytes: i64, total_bytes: i64, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO storage_snapshots (used_bytes, total_bytes) VALUES ($1, $2) RETURNING *",
        )
        .bind(used_bytes)
        .bind(total_bytes)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// The last snapshot of each of the past seven UTC calendar days (today included), oldest first.
    pub async fn daily_last_week(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT DISTINCT ON ((measured_at AT TIME ZONE 'UTC')::date)
                id, measured_at, used_bytes, total_bytes
            FROM storage_snapshots
            WHERE measured_at >= (date_trunc('day', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC') - INTERVAL '6 days'
            ORDER BY (measured_at AT TIME ZONE 'UTC')::date ASC, measured_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    // Adding 0.0 folds -0.0 into 0.0.
    (value * factor).round() / factor + 0.0
}

pub fn bytes_to_gb(bytes: i64) -> f64 {
    round_to(bytes as f64 / BYTES_PER_GB, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageMetric {
    pub used_bytes: i64,
    pub total_bytes: i64,
    pub used_gb: f64,
    pub total_gb: f64,
    pub usage_percent: f64,
    pub free_percent: f64,
}

impl StorageMetric {
    pub fn new(used_bytes: i64, total_bytes: i64) -> Self {
        let usage = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        let usage_percent = round_to(usage, 1);
        Self {
            used_bytes,
            total_bytes,
            used_gb: bytes_to_gb(used_bytes),
            total_gb: bytes_to_gb(total_bytes),
            usage_percent,
            free_percent: round_to(100.0 - usage_percent, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    pub day: String,
    pub value_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthMetric {
    pub percentage: String,
    pub growth_gb: String,
    pub history: Vec<GrowthPoint>,
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Seg",
        Weekday::Tue => "Ter",
        Weekday::Wed => "Qua",
        Weekday::Thu => "Qui",
        Weekday::Fri => "Sex",
        Weekday::Sat => "Sáb",
        Weekday::Sun => "Dom",
    }
}

impl GrowthMetric {
    /// Growth between the oldest and newest of the given daily snapshots.
    pub fn from_snapshots(snapshots: &[StorageSnapshot]) -> Self {
        let history: Vec<GrowthPoint> = snapshots
            .iter()
            .map(|s| GrowthPoint {
                day: weekday_label(s.measured_at.weekday()).to_string(),
                value_gb: bytes_to_gb(s.used_bytes),
            })
            .collect();

        let (first, last) = match (snapshots.first(), snapshots.last()) {
            (Some(first), Some(last)) => (first.used_bytes, last.used_bytes),
            _ => (0, 0),
        };

        let growth_gb = round_to((last - first) as f64 / BYTES_PER_GB, 2);
        let percentage = if first > 0 {
            round_to((last - first) as f64 / first as f64 * 100.0, 0)
        } else {
            0.0
        };

        Self {
            percentage: format!("{percentage:+.0}%"),
            growth_gb: format!("{growth_gb:+.2}GB"),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(day: u32, used_bytes: i64) -> StorageSnapshot {
        StorageSnapshot {
            id: day as i64,
            measured_at: Utc.with_ymd_and_hms(2024, 3, day, 23, 0, 0).unwrap(),
            used_bytes,
            total_bytes: 1_073_741_824,
        }
    }

    #[test]
    fn storage_metric_rounding() {
        let metric = StorageMetric::new(268_435_456, 1_073_741_824);
        assert_eq!(metric.used_gb, 0.25);
        assert_eq!(metric.total_gb, 1.0);
        assert_eq!(metric.usage_percent, 25.0);
        assert_eq!(metric.free_percent, 75.0);

        let metric = StorageMetric::new(1, 3);
        assert_eq!(metric.usage_percent, 33.3);
        assert_eq!(metric.free_percent, 66.7);
    }

    #[test]
    fn growth_over_the_week() {
        // 2024-03-04 is a Monday.
        let gb = 1_073_741_824_i64;
        let snapshots = vec![snapshot(4, gb), snapshot(5, gb + gb / 10), snapshot(10, gb + gb / 5)];
        let growth = GrowthMetric::from_snapshots(&snapshots);
        assert_eq!(growth.growth_gb, "+0.20GB");
        assert_eq!(growth.percentage, "+20%");
        let days: Vec<&str> = growth.history.iter().map(|p| p.day.as_str()).collect();
        assert_eq!(days, vec!["Seg", "Ter", "Dom"]);
        assert_eq!(growth.history[1].value_gb, 1.1);
    }

    #[test]
    fn growth_without_baseline() {
        let growth = GrowthMetric::from_snapshots(&[]);
        assert_eq!(growth.percentage, "+0%");
        assert_eq!(growth.growth_gb, "+0.00GB");
        assert!(growth.history.is_empty());
    }

    #[test]
    fn shrinking_database() {
        let gb = 1_073_741_824_i64;
        let growth = GrowthMetric::from_snapshots(&[snapshot(4, gb), snapshot(5, gb / 2)]);
        assert_eq!(growth.percentage, "-50%");
        assert_eq!(growth.growth_gb, "-0.50GB");
    }
}
