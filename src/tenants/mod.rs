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
pub(crate) mod cache;
pub(crate) mod dto;
pub(crate) mod handler;
pub(crate) mod middleware;
pub(crate) mod repository;
pub(crate) mod routes;
pub(crate) mod service;

use crate::common::types::{Domain, JsonObject, Slug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tenant_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Draft,
    Active,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "dns_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DnsStatus {
    Pending,
    Configuring,
    Configured,
    Failed,
}

/// A municipal tenant — the unit of isolation (spec.md §3). `domain` is the
/// globally-unique join key host resolution keys off; `slug` is the
/// second globally-unique handle used to derive the default
/// `{slug}.{base_domain}` hostname the provisioner manages.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: Slug,
    pub domain: Domain,
    pub display_name: String,
    pub contact: JsonObject,
    pub theme: JsonObject,
    pub settings: JsonObject,
    pub logo_url: Option<String>,
    pub notes: Option<String>,
    pub status: TenantStatus,
    pub dns_status: DnsStatus,
    pub dns_last_checked_at: Option<DateTime<Utc>>,
    pub dns_error: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        matches!(self.status, TenantStatus::Active)
    }
}
