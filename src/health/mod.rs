/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
pub(crate) mod repository;

use crate::tenants::DnsStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bucketed reachability of the most recent probe (spec.md §3 Health
/// snapshot, §4.9 "derived from the most recent event's status code").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "health_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

impl HealthStatus {
    /// 2xx→ok, 5xx→error, else→warning (spec.md §4.9).
    pub fn from_status_code(code: u16) -> Self {
        if (200..300).contains(&code) {
            HealthStatus::Ok
        } else if (500..600).contains(&code) {
            HealthStatus::Error
        } else {
            HealthStatus::Warning
        }
    }
}

/// One per tenant, upserted every monitor tick (spec.md §3 Health
/// snapshot). Rolled up over the trailing 24h window of `CheckEvent`s.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HealthSnapshot {
    pub tenant_id: Uuid,
    pub uptime_24h: f64,
    pub error_rate_24h: f64,
    pub response_p95_ms: Option<i64>,
    pub last_status: Option<HealthStatus>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub dns_status: DnsStatus,
    pub updated_at: DateTime<Utc>,
}

/// An append-only probe result (spec.md §3 Check event). `status_code` is
/// absent on a transport failure; `response_ms` is only present when the
/// request completed (success or a non-2xx response), never on a timeout
/// or connection error.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
    pub status_code: Option<i32>,
    pub response_ms: Option<i64>,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

/// The rolled-up numbers spec.md §4.9 derives from a tenant's trailing
/// 24h window of check events. Kept as a free function over a event
/// slice so the monitor loop can compute it without a database
/// round-trip per tenant beyond the window fetch itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregates {
    pub uptime_pct: f64,
    pub error_rate_pct: f64,
    pub p95_response_ms: Option<i64>,
    pub last_status: Option<HealthStatus>,
}

/// `events` must be ordered oldest-first; the last element is treated as
/// "most recent" for `last_status` (spec.md §4.9).
pub fn compute_aggregates(events: &[CheckEvent]) -> Aggregates {
    let total = events.len();
    if total == 0 {
        return Aggregates {
            uptime_pct: 0.0,
            error_rate_pct: 0.0,
            p95_response_ms: None,
            last_status: None,
        };
    }

    let success = events.iter().filter(|e| e.success).count();
    let uptime = success as f64 / total as f64;
    let error_rate = 1.0 - uptime;

    let mut response_times: Vec<i64> = events.iter().filter_map(|e| e.response_ms).collect();
    response_times.sort_unstable();
    let p95 = percentile_95(&response_times);

    let last_status = events.last().and_then(|e| e.status_code).map(|c| HealthStatus::from_status_code(c as u16));

    Aggregates {
        uptime_pct: round2(uptime * 100.0),
        error_rate_pct: round2(error_rate * 100.0),
        p95_response_ms: p95,
        last_status,
    }
}

/// Continuous P95 over an already-sorted sample, nearest-rank method.
fn percentile_95(sorted: &[i64]) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (0.95 * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted.get(rank).copied()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(success: bool, status_code: Option<i32>, response_ms: Option<i64>) -> CheckEvent {
        CheckEvent {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            source: "monitor".to_string(),
            occurred_at: Utc::now(),
            status_code,
            response_ms,
            success,
            error: None,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn empty_window_yields_zero_uptime() {
        let agg = compute_aggregates(&[]);
        assert_eq!(agg.uptime_pct, 0.0);
        assert_eq!(agg.error_rate_pct, 0.0);
        assert!(agg.p95_response_ms.is_none());
        assert!(agg.last_status.is_none());
    }

    #[test]
    fn computes_uptime_and_error_rate() {
        let events = vec![
            event(true, Some(200), Some(100)),
            event(true, Some(200), Some(150)),
            event(false, Some(500), Some(900)),
            event(true, Some(200), Some(120)),
        ];
        let agg = compute_aggregates(&events);
        assert_eq!(agg.uptime_pct, 75.0);
        assert_eq!(agg.error_rate_pct, 25.0);
    }

    #[test]
    fn last_status_follows_most_recent_event() {
        let events = vec![event(false, Some(500), Some(10)), event(true, Some(200), Some(10))];
        let agg = compute_aggregates(&events);
        assert_eq!(agg.last_status, Some(HealthStatus::Ok));
    }

    #[test]
    fn transport_failure_has_no_status_code_or_response_ms() {
        let mut e = event(false, None, None);
        e.error = Some("connection refused".to_string());
        let agg = compute_aggregates(&[e]);
        assert!(agg.last_status.is_none());
        assert!(agg.p95_response_ms.is_none());
    }
}
