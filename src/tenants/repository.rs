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
use crate::common::error::{RepositoryError, RepositoryResult};
use crate::common::types::{Domain, JsonObject, Slug};
use crate::tenants::{DnsStatus, Tenant, TenantStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct NewTenant {
    pub slug: Slug,
    pub domain: Domain,
    pub display_name: String,
    pub contact: JsonObject,
    pub theme: JsonObject,
    pub settings: JsonObject,
    pub logo_url: Option<String>,
    pub notes: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantsRepository: Send + Sync {
    /// Rejects with a uniqueness [`RepositoryError`] if `slug` or `domain`
    /// already exists — callers are expected to have already normalized
    /// both through their value-object `FromStr` impls.
    async fn create(&self, input: NewTenant) -> RepositoryResult<Tenant>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Tenant>>;
    async fn get_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tenant>>;
    async fn get_by_domain(&self, domain: &str) -> RepositoryResult<Option<Tenant>>;

    /// Ordered stably by `created_at` (spec.md §4.4).
    async fn list(&self) -> RepositoryResult<Vec<Tenant>>;

    /// Replaces the entire settings mapping atomically; `contact`/`theme`
    /// left `None` are unchanged.
    async fn update_settings(
        &self,
        id: Uuid,
        contact: Option<&JsonObject>,
        theme: Option<&JsonObject>,
        settings: Option<&JsonObject>,
    ) -> RepositoryResult<Tenant>;

    /// Sets `dns_error = null` whenever `status` is not `Failed`, per
    /// spec.md §4.4.
    async fn update_dns(
        &self,
        id: Uuid,
        status: DnsStatus,
        checked_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> RepositoryResult<Tenant>;

    async fn update_status(&self, id: Uuid, status: TenantStatus) -> RepositoryResult<Tenant>;
}

const TENANT_COLUMNS: &str = "id, slug, domain, display_name, contact, theme, settings, logo_url, \
     notes, status, dns_status, dns_last_checked_at, dns_error, activated_at, created_at, updated_at";

pub struct PgTenantsRepository {
    pool: PgPool,
}

impl PgTenantsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantsRepository for PgTenantsRepository {
    async fn create(&self, input: NewTenant) -> RepositoryResult<Tenant> {
        let query = format!(
            "insert into tenants \
             (id, slug, domain, display_name, contact, theme, settings, logo_url, notes, \
              status, dns_status, created_at, updated_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft', 'pending', now(), now()) \
             returning {TENANT_COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(Uuid::new_v4())
            .bind(input.slug.as_str())
            .bind(input.domain.as_str())
            .bind(&input.display_name)
            .bind(&input.contact)
            .bind(&input.theme)
            .bind(&input.settings)
            .bind(&input.logo_url)
            .bind(&input.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(map_create_error)?;
        Ok(tenant)
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Tenant>> {
        let query = format!("select {TENANT_COLUMNS} from tenants where id = $1");
        Ok(sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tenant>> {
        let query = format!("select {TENANT_COLUMNS} from tenants where slug = $1");
        Ok(sqlx::query_as::<_, Tenant>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_by_domain(&self, domain: &str) -> RepositoryResult<Option<Tenant>> {
        let query = format!("select {TENANT_COLUMNS} from tenants where domain = $1");
        Ok(sqlx::query_as::<_, Tenant>(&query)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self) -> RepositoryResult<Vec<Tenant>> {
        let query = format!("select {TENANT_COLUMNS} from tenants order by created_at");
        Ok(sqlx::query_as::<_, Tenant>(&query).fetch_all(&self.pool).await?)
    }

    async fn update_settings(
        &self,
        id: Uuid,
        contact: Option<&JsonObject>,
        theme: Option<&JsonObject>,
        settings: Option<&JsonObject>,
    ) -> RepositoryResult<Tenant> {
        let existing = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        let query = format!(
            "update tenants set contact = $2, theme = $3, settings = $4, updated_at = now() \
             where id = $1 returning {TENANT_COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .bind(contact.unwrap_or(&existing.contact))
            .bind(theme.unwrap_or(&existing.theme))
            .bind(settings.unwrap_or(&existing.settings))
            .fetch_one(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn update_dns(
        &self,
        id: Uuid,
        status: DnsStatus,
        checked_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> RepositoryResult<Tenant> {
        let error = if matches!(status, DnsStatus::Failed) { error } else { None };
        let activated_clause = if matches!(status, DnsStatus::Configured) {
            "activated_at = coalesce(activated_at, now()),"
        } else {
            ""
        };
        let query = format!(
            "update tenants set dns_status = $2, dns_last_checked_at = $3, dns_error = $4, \
             {activated_clause} updated_at = now() where id = $1 returning {TENANT_COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .bind(status)
            .bind(checked_at)
            .bind(error)
            .fetch_one(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn update_status(&self, id: Uuid, status: TenantStatus) -> RepositoryResult<Tenant> {
        let activated_clause = if matches!(status, TenantStatus::Active) {
            "activated_at = coalesce(activated_at, now()),"
        } else {
            ""
        };
        let query = format!(
            "update tenants set status = $2, {activated_clause} updated_at = now() \
             where id = $1 returning {TENANT_COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(tenant)
    }
}

fn map_create_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or("");
        return if constraint.contains("domain") {
            RepositoryError::DomainTaken
        } else {
            RepositoryError::SlugTaken
        };
    }
    RepositoryError::Database(e)
}
