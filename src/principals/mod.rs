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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single platform-admin role (spec.md §3 Principal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "platform_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    Owner,
    Admin,
    Support,
    Finance,
}

impl PlatformRole {
    pub fn as_role_str(self) -> &'static str {
        match self {
            PlatformRole::Owner => "OWNER",
            PlatformRole::Admin => "ADMIN",
            PlatformRole::Support => "SUPPORT",
            PlatformRole::Finance => "FINANCE",
        }
    }
}

/// A platform administrator — one row per principal, one fixed role.
/// Comes from a table disjoint from backoffice operators (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformAdmin {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub role: PlatformRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed vocabulary of backoffice role labels a secretariat membership
/// can carry (spec.md §3, Glossary). `PROFESSOR` is never assigned
/// directly — it is derived at role-assembly time from teacher↔class
/// assignments (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "backoffice_role_label", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackofficeRoleLabel {
    AdminTec,
    Secretario,
    Atendente,
    Professor,
}

impl BackofficeRoleLabel {
    pub fn as_role_str(self) -> &'static str {
        match self {
            BackofficeRoleLabel::AdminTec => "ADMIN_TEC",
            BackofficeRoleLabel::Secretario => "SECRETARIO",
            BackofficeRoleLabel::Atendente => "ATENDENTE",
            BackofficeRoleLabel::Professor => "PROFESSOR",
        }
    }
}

/// One (secretariat, role label) membership pair for a backoffice
/// operator (spec.md §3 "set of {secretariat-id, role-label} pairs").
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecretariatMembership {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub secretariat_id: Uuid,
    pub role_label: BackofficeRoleLabel,
}

/// A backoffice operator, the municipal-staff population. Role assembly
/// (spec.md §4.6) unions `memberships`' labels (uppercased, which the
/// enum already guarantees) with the virtual `PROFESSOR` role iff
/// `has_teacher_class_assignment` is true for this principal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BackofficeOperator {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
