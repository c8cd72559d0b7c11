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
use crate::common::types::{Domain, JsonObject, Slug};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub slug: Slug,
    pub domain: Domain,
    pub display_name: String,
    #[serde(default)]
    pub contact: JsonObject,
    #[serde(default)]
    pub theme: JsonObject,
    #[serde(default)]
    pub settings: JsonObject,
    pub logo_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantSettingsRequest {
    pub contact: Option<JsonObject>,
    pub theme: Option<JsonObject>,
    pub settings: Option<JsonObject>,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: uuid::Uuid,
    pub slug: String,
    pub domain: String,
    pub display_name: String,
    pub contact: serde_json::Value,
    pub theme: serde_json::Value,
    pub settings: serde_json::Value,
    pub logo_url: Option<String>,
    pub notes: Option<String>,
    pub status: crate::tenants::TenantStatus,
    pub dns_status: crate::tenants::DnsStatus,
    pub dns_last_checked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub dns_error: Option<String>,
    pub activated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::tenants::Tenant> for TenantResponse {
    fn from(t: crate::tenants::Tenant) -> Self {
        Self {
            id: t.id,
            slug: t.slug.to_string(),
            domain: t.domain.to_string(),
            display_name: t.display_name,
            contact: t.contact.into_value(),
            theme: t.theme.into_value(),
            settings: t.settings.into_value(),
            logo_url: t.logo_url,
            notes: t.notes,
            status: t.status,
            dns_status: t.dns_status,
            dns_last_checked_at: t.dns_last_checked_at,
            dns_error: t.dns_error,
            activated_at: t.activated_at,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}
