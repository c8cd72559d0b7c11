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
use crate::common::error::RepositoryResult;
use crate::health::{CheckEvent, HealthSnapshot, HealthStatus};
use crate::tenants::DnsStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct NewCheckEvent {
    pub tenant_id: Uuid,
    pub source: String,
    pub status_code: Option<i32>,
    pub response_ms: Option<i64>,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

/// Persists the append-only probe trail (C9) and the per-tenant rollup
/// (spec.md §3 Health snapshot / Check event). Kept as one trait since
/// both are written by the same monitor tick and read together by the
/// tenant health handler, mirroring the teacher's habit of grouping
/// closely-coupled tables under a single repository trait (e.g.
/// `manager/auth/repository.rs` covering both principals and refresh
/// tokens in the teacher's own auth module).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthRepository: Send + Sync {
    async fn insert_check_event(&self, event: NewCheckEvent) -> RepositoryResult<CheckEvent>;

    /// All events for `tenant_id` with `occurred_at >= since`, ordered
    /// oldest-first (spec.md §4.9 aggregates over "last 24h").
    async fn list_events_since(&self, tenant_id: Uuid, since: DateTime<Utc>) -> RepositoryResult<Vec<CheckEvent>>;

    /// Upserts the tenant's rollup row by tenant id (spec.md §3 "Upsert by
    /// tenant id").
    async fn upsert_snapshot(
        &self,
        tenant_id: Uuid,
        uptime_24h: f64,
        error_rate_24h: f64,
        response_p95_ms: Option<i64>,
        last_status: Option<HealthStatus>,
        last_checked_at: Option<DateTime<Utc>>,
        dns_status: DnsStatus,
    ) -> RepositoryResult<HealthSnapshot>;

    async fn get_snapshot(&self, tenant_id: Uuid) -> RepositoryResult<Option<HealthSnapshot>>;
}

pub struct PgHealthRepository {
    pool: PgPool,
}

impl PgHealthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthRepository for PgHealthRepository {
    async fn insert_check_event(&self, event: NewCheckEvent) -> RepositoryResult<CheckEvent> {
        let row = sqlx::query_as::<_, CheckEvent>(
            r#"
            insert into check_events
                (id, tenant_id, source, occurred_at, status_code, response_ms, success, error, metadata)
            values ($1, $2, $3, now(), $4, $5, $6, $7, $8)
            returning id, tenant_id, source, occurred_at, status_code, response_ms, success, error, metadata
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.tenant_id)
        .bind(&event.source)
        .bind(event.status_code)
        .bind(event.response_ms)
        .bind(event.success)
        .bind(&event.error)
        .bind(&event.metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_events_since(&self, tenant_id: Uuid, since: DateTime<Utc>) -> RepositoryResult<Vec<CheckEvent>> {
        let rows = sqlx::query_as::<_, CheckEvent>(
            r#"
            select id, tenant_id, source, occurred_at, status_code, response_ms, success, error, metadata
            from check_events
            where tenant_id = $1 and occurred_at >= $2
            order by occurred_at asc
            "#,
        )
        .bind(tenant_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_snapshot(
        &self,
        tenant_id: Uuid,
        uptime_24h: f64,
        error_rate_24h: f64,
        response_p95_ms: Option<i64>,
        last_status: Option<HealthStatus>,
        last_checked_at: Option<DateTime<Utc>>,
        dns_status: DnsStatus,
    ) -> RepositoryResult<HealthSnapshot> {
        let row = sqlx::query_as::<_, HealthSnapshot>(
            r#"
            insert into health_snapshots
                (tenant_id, uptime_24h, error_rate_24h, response_p95_ms, last_status, last_checked_at, dns_status, updated_at)
            values ($1, $2, $3, $4, $5, $6, $7, now())
            on conflict (tenant_id) do update set
                uptime_24h = excluded.uptime_24h,
                error_rate_24h = excluded.error_rate_24h,
                response_p95_ms = excluded.response_p95_ms,
                last_status = excluded.last_status,
                last_checked_at = excluded.last_checked_at,
                dns_status = excluded.dns_status,
                updated_at = now()
            returning tenant_id, uptime_24h, error_rate_24h, response_p95_ms, last_status,
                      last_checked_at, dns_status, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(uptime_24h)
        .bind(error_rate_24h)
        .bind(response_p95_ms)
        .bind(last_status)
        .bind(last_checked_at)
        .bind(dns_status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_snapshot(&self, tenant_id: Uuid) -> RepositoryResult<Option<HealthSnapshot>> {
        let row = sqlx::query_as::<_, HealthSnapshot>(
            r#"
            select tenant_id, uptime_24h, error_rate_24h, response_p95_ms, last_status,
                   last_checked_at, dns_status, updated_at
            from health_snapshots
            where tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
