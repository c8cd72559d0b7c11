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
use crate::common::error::{ApiError, ApiErrorCode};
use crate::common::types::JsonObject;
use crate::tenants::cache::ResolverCache;
use crate::tenants::repository::{NewTenant, TenantsRepository};
use crate::tenants::{Tenant, TenantStatus};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TenantsServiceError {
    #[error(transparent)]
    Repository(#[from] crate::common::error::RepositoryError),
    #[error("tenant not found")]
    NotFound,
}

impl From<TenantsServiceError> for ApiError {
    fn from(value: TenantsServiceError) -> Self {
        match value {
            TenantsServiceError::Repository(e) => e.into(),
            TenantsServiceError::NotFound => ApiError::new(ApiErrorCode::TenantNotFound, "Tenant not found"),
        }
    }
}

pub type TenantsServiceResult<T> = Result<T, TenantsServiceError>;

/// Orchestrates the tenant registry (C4) and keeps the resolver cache
/// (C5) coherent with every write, grounded in the teacher's
/// `manager/tenants/service.rs` thin-orchestration-over-repository shape.
/// DNS provisioning itself is a separate concern (see
/// `crate::provisioning`), matching spec.md's split between C4/C8.
pub struct TenantsService {
    repository: Arc<dyn TenantsRepository>,
    cache: Arc<ResolverCache>,
}

impl TenantsService {
    pub fn new(repository: Arc<dyn TenantsRepository>, cache: Arc<ResolverCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn create(&self, input: NewTenant) -> TenantsServiceResult<Tenant> {
        let tenant = self.repository.create(input).await?;
        self.cache.insert_created(&tenant);
        Ok(tenant)
    }

    pub async fn get(&self, id: Uuid) -> TenantsServiceResult<Tenant> {
        self.repository.get_by_id(id).await?.ok_or(TenantsServiceError::NotFound)
    }

    pub async fn list(&self) -> TenantsServiceResult<Vec<Tenant>> {
        let tenants = self.repository.list().await?;
        self.cache.refresh_all(&tenants);
        Ok(tenants)
    }

    pub async fn update_settings(
        &self,
        id: Uuid,
        contact: Option<&JsonObject>,
        theme: Option<&JsonObject>,
        settings: Option<&JsonObject>,
    ) -> TenantsServiceResult<Tenant> {
        let tenant = self.repository.update_settings(id, contact, theme, settings).await?;
        self.cache.invalidate_tenant(id);
        Ok(tenant)
    }

    pub async fn suspend(&self, id: Uuid) -> TenantsServiceResult<Tenant> {
        let tenant = self.repository.update_status(id, TenantStatus::Suspended).await?;
        self.cache.invalidate_tenant(id);
        Ok(tenant)
    }

    pub async fn activate(&self, id: Uuid) -> TenantsServiceResult<Tenant> {
        let tenant = self.repository.update_status(id, TenantStatus::Active).await?;
        self.cache.invalidate_tenant(id);
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Domain, JsonObject, Slug};
    use crate::tenants::repository::MockTenantsRepository;
    use crate::tenants::DnsStatus;
    use std::time::Duration;

    fn sample_tenant(id: Uuid) -> Tenant {
        Tenant {
            id,
            slug: "cabaceiras".parse::<Slug>().unwrap(),
            domain: "cabaceiras.urbanbyte.com.br".parse::<Domain>().unwrap(),
            display_name: "Cabaceiras".to_string(),
            contact: JsonObject::empty(),
            theme: JsonObject::empty(),
            settings: JsonObject::empty(),
            logo_url: None,
            notes: None,
            status: TenantStatus::Active,
            dns_status: DnsStatus::Pending,
            dns_last_checked_at: None,
            dns_error: None,
            activated_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_pre_populates_cache_by_domain() {
        let id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        repo.expect_create().returning(move |_| Ok(sample_tenant(id)));
        let cache = Arc::new(ResolverCache::new(Duration::from_secs(60)));
        let service = TenantsService::new(Arc::new(repo), cache.clone());

        let input = NewTenant {
            slug: "cabaceiras".parse().unwrap(),
            domain: "cabaceiras.urbanbyte.com.br".parse().unwrap(),
            display_name: "Cabaceiras".to_string(),
            contact: JsonObject::empty(),
            theme: JsonObject::empty(),
            settings: JsonObject::empty(),
            logo_url: None,
            notes: None,
        };
        service.create(input).await.unwrap();

        let cached = cache.get("cabaceiras.urbanbyte.com.br").unwrap();
        assert_eq!(cached.id, id);
    }

    #[tokio::test]
    async fn update_settings_invalidates_cache() {
        let id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        repo.expect_update_settings().returning(move |_, _, _, _| Ok(sample_tenant(id)));
        let cache = Arc::new(ResolverCache::new(Duration::from_secs(60)));
        cache.put("cabaceiras.urbanbyte.com.br".to_string(), sample_tenant(id));
        let service = TenantsService::new(Arc::new(repo), cache.clone());

        service.update_settings(id, None, None, Some(&JsonObject::empty())).await.unwrap();

        assert!(cache.get("cabaceiras.urbanbyte.com.br").is_none());
    }
}
