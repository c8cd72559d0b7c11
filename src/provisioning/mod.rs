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
use crate::cdn::CdnClient;
use crate::common::error::{RepositoryError, RepositoryResult};
use crate::tenants::repository::TenantsRepository;
use crate::tenants::{DnsStatus, Tenant};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Zone and CNAME target configuration the provisioner needs, independent
/// of how the caller sources it (decouples this module from `AppConfig`
/// so it stays unit-testable against fakes).
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    pub zone_id: String,
    pub base_domain: String,
    pub cname_target: String,
    pub default_ttl: u32,
}

/// Drives `tenant.dns_status` through the state machine spec.md §4.8
/// defines: `pending → configuring → {configured, failed}`, with
/// `configuring` able to retry itself on a transient propagation miss.
/// Only `ensure_cname` errors can set `failed`; probes only move between
/// `configuring` and `configured`, never downgrading a `configured`
/// tenant.
pub struct Provisioner {
    tenants_repository: Arc<dyn TenantsRepository>,
    cdn_client: Arc<dyn CdnClient>,
    config: ProvisioningConfig,
}

impl Provisioner {
    pub fn new(tenants_repository: Arc<dyn TenantsRepository>, cdn_client: Arc<dyn CdnClient>, config: ProvisioningConfig) -> Self {
        Self { tenants_repository, cdn_client, config }
    }

    fn fqdn(&self, slug: &str) -> String {
        format!("{}.{}", slug, self.config.base_domain)
    }

    /// Steps 1-4 of spec.md §4.8: ensure the CNAME exists with the right
    /// content, then immediately verify propagation.
    pub async fn provision_tenant(&self, tenant_id: Uuid, proxied: bool) -> RepositoryResult<Tenant> {
        let tenant = self.tenants_repository.get_by_id(tenant_id).await?.ok_or(RepositoryError::NotFound)?;
        let fqdn = self.fqdn(tenant.slug.as_str());

        let ensure_result = self
            .cdn_client
            .ensure_cname(&self.config.zone_id, &fqdn, &self.config.cname_target, proxied, self.config.default_ttl)
            .await;

        if let Err(e) = ensure_result {
            return self.tenants_repository.update_dns(tenant_id, DnsStatus::Failed, Utc::now(), Some(&e.to_string())).await;
        }

        self.verify_propagation(tenant_id, &fqdn).await
    }

    /// `check_tenant`: repeats only the propagation-verification step
    /// (spec.md §4.8). Never downgrades `configured` to `failed`.
    pub async fn check_tenant(&self, tenant_id: Uuid) -> RepositoryResult<Tenant> {
        let tenant = self.tenants_repository.get_by_id(tenant_id).await?.ok_or(RepositoryError::NotFound)?;
        let fqdn = self.fqdn(tenant.slug.as_str());
        self.verify_propagation(tenant_id, &fqdn).await
    }

    async fn verify_propagation(&self, tenant_id: Uuid, fqdn: &str) -> RepositoryResult<Tenant> {
        match self.cdn_client.check_propagation(fqdn, &self.config.cname_target).await {
            Ok(true) => self.tenants_repository.update_dns(tenant_id, DnsStatus::Configured, Utc::now(), None).await,
            Ok(false) => self.tenants_repository.update_dns(tenant_id, DnsStatus::Configuring, Utc::now(), None).await,
            Err(e) => {
                self.tenants_repository
                    .update_dns(tenant_id, DnsStatus::Configuring, Utc::now(), Some(&e.to_string()))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::{CdnError, CnameRecord};
    use crate::common::types::{Domain, JsonObject, Slug};
    use crate::tenants::repository::MockTenantsRepository;
    use crate::tenants::{Tenant, TenantStatus};
    use async_trait::async_trait;
    use mockall::predicate::*;
    use std::str::FromStr;

    fn config() -> ProvisioningConfig {
        ProvisioningConfig {
            zone_id: "zone-1".to_string(),
            base_domain: "urbanbyte.com.br".to_string(),
            cname_target: "edge.example.net".to_string(),
            default_ttl: 300,
        }
    }

    fn tenant(id: Uuid) -> Tenant {
        Tenant {
            id,
            slug: Slug::from_str("cabaceiras").unwrap(),
            domain: Domain::from_str("cabaceiras.urbanbyte.com.br").unwrap(),
            display_name: "Cabaceiras".to_string(),
            contact: JsonObject::empty(),
            theme: JsonObject::empty(),
            settings: JsonObject::empty(),
            logo_url: None,
            notes: None,
            status: TenantStatus::Draft,
            dns_status: DnsStatus::Pending,
            dns_last_checked_at: None,
            dns_error: None,
            activated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct StubCdnClient {
        ensure_ok: bool,
        propagated: bool,
    }

    #[async_trait]
    impl CdnClient for StubCdnClient {
        async fn find_cname(&self, _zone_id: &str, _name: &str) -> Result<Option<CnameRecord>, CdnError> {
            Ok(None)
        }
        async fn create_cname(&self, _zone_id: &str, _name: &str, _target: &str, _ttl: u32, _proxied: bool) -> Result<String, CdnError> {
            if self.ensure_ok {
                Ok("record-1".to_string())
            } else {
                Err(CdnError::Provider { status: 500, message: "boom".to_string(), body: None })
            }
        }
        async fn update_cname(&self, _zone_id: &str, _id: &str, _name: &str, _target: &str, _ttl: u32, _proxied: bool) -> Result<(), CdnError> {
            Ok(())
        }
        async fn check_propagation(&self, _name: &str, _expected_target: &str) -> Result<bool, CdnError> {
            Ok(self.propagated)
        }
    }

    fn tenant_with_status(id: Uuid, dns_status: DnsStatus) -> Tenant {
        let mut t = tenant(id);
        t.dns_status = dns_status;
        t
    }

    #[tokio::test]
    async fn happy_path_ends_configured() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        let t = tenant(tenant_id);
        repo.expect_get_by_id().returning(move |_| Ok(Some(t.clone())));
        repo.expect_update_dns()
            .with(eq(tenant_id), eq(DnsStatus::Configured), always(), eq(None))
            .returning(move |_, _, _, _| Ok(tenant_with_status(tenant_id, DnsStatus::Configured)));

        let provisioner = Provisioner::new(Arc::new(repo), Arc::new(StubCdnClient { ensure_ok: true, propagated: true }), config());
        let result = provisioner.provision_tenant(tenant_id, false).await.unwrap();
        assert_eq!(result.dns_status, DnsStatus::Configured);
    }

    #[tokio::test]
    async fn cdn_error_sets_failed() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        let t = tenant(tenant_id);
        repo.expect_get_by_id().returning(move |_| Ok(Some(t.clone())));
        repo.expect_update_dns()
            .withf(move |id, status, _, error| *id == tenant_id && *status == DnsStatus::Failed && error.is_some())
            .returning(move |_, _, _, _| Ok(tenant_with_status(tenant_id, DnsStatus::Failed)));

        let provisioner = Provisioner::new(Arc::new(repo), Arc::new(StubCdnClient { ensure_ok: false, propagated: true }), config());
        let result = provisioner.provision_tenant(tenant_id, false).await.unwrap();
        assert_eq!(result.dns_status, DnsStatus::Failed);
    }

    #[tokio::test]
    async fn negative_propagation_stays_configuring() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        let t = tenant(tenant_id);
        repo.expect_get_by_id().returning(move |_| Ok(Some(t.clone())));
        repo.expect_update_dns()
            .with(eq(tenant_id), eq(DnsStatus::Configuring), always(), eq(None))
            .returning(move |_, _, _, _| Ok(tenant_with_status(tenant_id, DnsStatus::Configuring)));

        let provisioner = Provisioner::new(Arc::new(repo), Arc::new(StubCdnClient { ensure_ok: true, propagated: false }), config());
        let result = provisioner.provision_tenant(tenant_id, false).await.unwrap();
        assert_eq!(result.dns_status, DnsStatus::Configuring);
    }

    #[tokio::test]
    async fn check_tenant_never_downgrades_configured_to_failed() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        let t = tenant_with_status(tenant_id, DnsStatus::Configured);
        repo.expect_get_by_id().returning(move |_| Ok(Some(t.clone())));
        repo.expect_update_dns()
            .withf(|_, status, _, _| *status != DnsStatus::Failed)
            .returning(move |_, _, _, _| Ok(tenant_with_status(tenant_id, DnsStatus::Configured)));

        let provisioner = Provisioner::new(Arc::new(repo), Arc::new(StubCdnClient { ensure_ok: true, propagated: false }), config());
        let result = provisioner.check_tenant(tenant_id).await.unwrap();
        assert_ne!(result.dns_status, DnsStatus::Failed);
    }
}
