//! Admin dashboard metrics.

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use cred_core::AppError;
use cred_db::RegistrationStatus;
use serde::Serialize;

use crate::startup::AppState;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Zero-filled per-status counts, serialized with the wire status names.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusBreakdown {
    #[serde(rename = "PENDING")]
    pub pending: i64,
    #[serde(rename = "APPROVED")]
    pub approved: i64,
    #[serde(rename = "REJECTED")]
    pub rejected: i64,
    #[serde(rename = "ADJUSTMENT_REQUESTED")]
    pub adjustment_requested: i64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyVolumeItem {
    /// `YYYY-MM`.
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_registrations: i64,
    pub last_30_days: i64,
    pub last_60_days: i64,
    pub last_90_days: i64,
    pub by_status: StatusBreakdown,
    pub monthly_volume: Vec<MonthlyVolumeItem>,
    pub analyzed_this_month: i64,
    pub avg_analysis_time_days: Option<f64>,
}

/// `GET /api/dashboard` — the reviewer landing-page metrics.
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    let now = Utc::now();

    let volume = state.db.dashboard.volume_counts(now).await?;
    let status_counts = state.db.dashboard.status_counts().await?;
    let monthly = state.db.dashboard.monthly_volume(now).await?;
    let analyzed = state.db.audit.analyzed_since(month_start(now)).await?;
    let avg_seconds = state.db.dashboard.avg_analysis_seconds().await?;

    let mut by_status = StatusBreakdown::default();
    for row in status_counts {
        match row.status {
            RegistrationStatus::Pending => by_status.pending = row.count,
            RegistrationStatus::Approved => by_status.approved = row.count,
            RegistrationStatus::Rejected => by_status.rejected = row.count,
            RegistrationStatus::AdjustmentRequested => by_status.adjustment_requested = row.count,
        }
    }

    let counts_by_month: HashMap<String, i64> = monthly
        .into_iter()
        .map(|row| (row.month.format("%Y-%m").to_string(), row.count))
        .collect();
    let monthly_volume = trailing_months(now)
        .into_iter()
        .map(|month| {
            let count = counts_by_month.get(&month).copied().unwrap_or(0);
            MonthlyVolumeItem { month, count }
        })
        .collect();

    Ok(Json(DashboardResponse {
        total_registrations: volume.total,
        last_30_days: volume.last_30_days,
        last_60_days: volume.last_60_days,
        last_90_days: volume.last_90_days,
        by_status,
        monthly_volume,
        analyzed_this_month: analyzed,
        avg_analysis_time_days: avg_seconds.map(round_to_days),
    }))
}

/// First instant of the current calendar month.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// The last 12 calendar months as `YYYY-MM` keys, oldest first.
fn trailing_months(now: DateTime<Utc>) -> Vec<String> {
    let mut year = now.year();
    let mut month = now.month();
    let mut keys = Vec::with_capacity(12);

    for _ in 0..12 {
        keys.push(format!("{year:04}-{month:02}"));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }

    keys.reverse();
    keys
}

/// Seconds to days with one decimal.
fn round_to_days(seconds: f64) -> f64 {
    (seconds / SECONDS_PER_DAY * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_months_span_a_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let months = trailing_months(now);

        assert_eq!(months.len(), 12);
        assert_eq!(months.first().map(String::as_str), Some("2025-04"));
        assert_eq!(months.last().map(String::as_str), Some("2026-03"));
    }

    #[test]
    fn month_start_truncates() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 18, 30, 0).unwrap();
        let start = month_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn analysis_time_rounds_to_one_decimal() {
        assert_eq!(round_to_days(86_400.0), 1.0);
        assert_eq!(round_to_days(129_600.0), 1.5);
        assert_eq!(round_to_days(100_000.0), 1.2);
        assert_eq!(round_to_days(0.0), 0.0);
    }

    #[test]
    fn status_breakdown_serializes_wire_names() {
        let json = serde_json::to_value(StatusBreakdown {
            pending: 3,
            ..StatusBreakdown::default()
        })
        .unwrap();

        assert_eq!(json["PENDING"], 3);
        assert_eq!(json["ADJUSTMENT_REQUESTED"], 0);
    }
}
