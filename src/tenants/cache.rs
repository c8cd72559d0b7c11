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
use crate::tenants::Tenant;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

struct Entry {
    tenant: Tenant,
    expires_at: DateTime<Utc>,
}

/// Bounded-TTL host-to-tenant resolution cache (spec.md §4.5, §3 "Session
/// resolution entry"), sitting in front of the tenants repository the way
/// the teacher's `PgPoolManager` sits in front of per-tenant connection
/// setup (`manager/app/database.rs`) — both are a `RwLock`-guarded map
/// protecting a more expensive lookup, invalidated explicitly on write
/// rather than only by expiry. Holds a value copy of the tenant snapshot,
/// not just its id, so a cache hit never re-touches the registry.
pub struct ResolverCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResolverCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a value copy if present and not past `expires_at`; the
    /// cache never serves a value past its own expiry, regardless of how
    /// long it sat unread.
    pub fn get(&self, host: &str) -> Option<Tenant> {
        let entries = self.entries.read().expect("resolver cache lock poisoned");
        let entry = entries.get(host)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        Some(entry.tenant.clone())
    }

    pub fn put(&self, host: String, tenant: Tenant) {
        let mut entries = self.entries.write().expect("resolver cache lock poisoned");
        let expires_at = Utc::now() + self.ttl;
        entries.insert(host, Entry { tenant, expires_at });
    }

    /// Pre-populates the entry for a freshly created tenant's domain, per
    /// spec.md §4.5 "On create(tenant): pre-populate host entry".
    pub fn insert_created(&self, tenant: &Tenant) {
        self.put(tenant.domain.as_str().to_string(), tenant.clone());
    }

    /// Scans entries and deletes any whose cached tenant id matches —
    /// used on `update_settings`/`update_dns` so a stale snapshot never
    /// outlives the write that invalidated it.
    pub fn invalidate_tenant(&self, tenant_id: Uuid) {
        let mut entries = self.entries.write().expect("resolver cache lock poisoned");
        entries.retain(|_, entry| entry.tenant.id != tenant_id);
    }

    /// Refreshes every cached host pointing at one of `tenants` with a
    /// fresh snapshot and expiry — used after `list()` per spec.md §4.5.
    pub fn refresh_all(&self, tenants: &[Tenant]) {
        let mut entries = self.entries.write().expect("resolver cache lock poisoned");
        let expires_at = Utc::now() + self.ttl;
        for tenant in tenants {
            if let Some(entry) = entries.get_mut(tenant.domain.as_str()) {
                entry.tenant = tenant.clone();
                entry.expires_at = expires_at;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Domain, JsonObject, Slug};
    use crate::tenants::{DnsStatus, TenantStatus};

    fn sample(id: Uuid, domain: &str) -> Tenant {
        Tenant {
            id,
            slug: "cabaceiras".parse::<Slug>().unwrap(),
            domain: domain.parse::<Domain>().unwrap(),
            display_name: "Cabaceiras".to_string(),
            contact: JsonObject::empty(),
            theme: JsonObject::empty(),
            settings: JsonObject::empty(),
            logo_url: None,
            notes: None,
            status: TenantStatus::Active,
            dns_status: DnsStatus::Configured,
            dns_last_checked_at: None,
            dns_error: None,
            activated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn returns_none_past_ttl() {
        let cache = ResolverCache::new(Duration::from_millis(0));
        let id = Uuid::new_v4();
        cache.put("cabaceiras.urbanbyte.com.br".to_string(), sample(id, "cabaceiras.urbanbyte.com.br"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("cabaceiras.urbanbyte.com.br").is_none());
    }

    #[test]
    fn hit_returns_value_copy() {
        let cache = ResolverCache::new(Duration::from_secs(120));
        let id = Uuid::new_v4();
        cache.put("cabaceiras.urbanbyte.com.br".to_string(), sample(id, "cabaceiras.urbanbyte.com.br"));
        let hit = cache.get("cabaceiras.urbanbyte.com.br").unwrap();
        assert_eq!(hit.id, id);
    }

    #[test]
    fn invalidate_removes_all_hosts_for_tenant() {
        let cache = ResolverCache::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        cache.put("cabaceiras.urbanbyte.com.br".to_string(), sample(id, "cabaceiras.urbanbyte.com.br"));
        cache.invalidate_tenant(id);
        assert!(cache.get("cabaceiras.urbanbyte.com.br").is_none());
    }
}
