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
use crate::alerts::{Alert, AlertType, Severity};
use crate::common::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertsRepository: Send + Sync {
    /// The newest row for `(tenant_id, alert_type)` regardless of
    /// `delivered` — spec.md §9 resolves the "does an undelivered alert
    /// still count toward throttling" open question as yes, since it
    /// already consumed the slot.
    async fn latest_for_tenant_and_type(
        &self,
        tenant_id: Uuid,
        alert_type: AlertType,
    ) -> RepositoryResult<Option<Alert>>;

    async fn insert(
        &self,
        tenant_id: Option<Uuid>,
        alert_type: AlertType,
        severity: Severity,
        message: &str,
        metadata: serde_json::Value,
    ) -> RepositoryResult<Alert>;

    async fn mark_delivered(&self, id: Uuid, channel: &str, delivered_at: DateTime<Utc>) -> RepositoryResult<()>;
}

pub struct PgAlertsRepository {
    pool: PgPool,
}

impl PgAlertsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertsRepository for PgAlertsRepository {
    async fn latest_for_tenant_and_type(
        &self,
        tenant_id: Uuid,
        alert_type: AlertType,
    ) -> RepositoryResult<Option<Alert>> {
        let row = sqlx::query_as::<_, Alert>(
            r#"
            select id, tenant_id, alert_type, severity, message, triggered_at,
                   delivered, delivery_channel, delivered_at, metadata
            from alerts
            where tenant_id = $1 and alert_type = $2
            order by triggered_at desc
            limit 1
            "#,
        )
        .bind(tenant_id)
        .bind(alert_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(
        &self,
        tenant_id: Option<Uuid>,
        alert_type: AlertType,
        severity: Severity,
        message: &str,
        metadata: serde_json::Value,
    ) -> RepositoryResult<Alert> {
        let row = sqlx::query_as::<_, Alert>(
            r#"
            insert into alerts
                (id, tenant_id, alert_type, severity, message, triggered_at, delivered, metadata)
            values ($1, $2, $3, $4, $5, now(), false, $6)
            returning id, tenant_id, alert_type, severity, message, triggered_at,
                      delivered, delivery_channel, delivered_at, metadata
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(alert_type)
        .bind(severity)
        .bind(message)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_delivered(&self, id: Uuid, channel: &str, delivered_at: DateTime<Utc>) -> RepositoryResult<()> {
        sqlx::query("update alerts set delivered = true, delivery_channel = $2, delivered_at = $3 where id = $1")
            .bind(id)
            .bind(channel)
            .bind(delivered_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
