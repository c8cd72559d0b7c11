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
use crate::principals::{BackofficeOperator, PlatformAdmin, SecretariatMembership};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Persists and looks up the two disjoint principal populations plus the
/// secretariat memberships and teacher↔class assignments role assembly
/// (`crate::auth::service`) reads from (spec.md §3, §4.6).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalsRepository: Send + Sync {
    async fn get_backoffice_by_email(&self, email: &str) -> RepositoryResult<Option<BackofficeOperator>>;
    async fn get_backoffice_by_id(&self, id: Uuid) -> RepositoryResult<Option<BackofficeOperator>>;
    async fn get_platform_admin_by_email(&self, email: &str) -> RepositoryResult<Option<PlatformAdmin>>;
    async fn get_platform_admin_by_id(&self, id: Uuid) -> RepositoryResult<Option<PlatformAdmin>>;
    async fn list_secretariat_memberships(&self, principal_id: Uuid) -> RepositoryResult<Vec<SecretariatMembership>>;
    async fn has_teacher_class_assignment(&self, principal_id: Uuid) -> RepositoryResult<bool>;
}

pub struct PgPrincipalsRepository {
    pool: PgPool,
}

impl PgPrincipalsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalsRepository for PgPrincipalsRepository {
    async fn get_backoffice_by_email(&self, email: &str) -> RepositoryResult<Option<BackofficeOperator>> {
        let row = sqlx::query_as::<_, BackofficeOperator>(
            r#"
            select id, tenant_id, display_name, email, password_hash, active, created_at, updated_at
            from backoffice_operators
            where email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_backoffice_by_id(&self, id: Uuid) -> RepositoryResult<Option<BackofficeOperator>> {
        let row = sqlx::query_as::<_, BackofficeOperator>(
            r#"
            select id, tenant_id, display_name, email, password_hash, active, created_at, updated_at
            from backoffice_operators
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_platform_admin_by_email(&self, email: &str) -> RepositoryResult<Option<PlatformAdmin>> {
        let row = sqlx::query_as::<_, PlatformAdmin>(
            r#"
            select id, display_name, email, password_hash, active, role, created_at, updated_at
            from platform_admins
            where email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_platform_admin_by_id(&self, id: Uuid) -> RepositoryResult<Option<PlatformAdmin>> {
        let row = sqlx::query_as::<_, PlatformAdmin>(
            r#"
            select id, display_name, email, password_hash, active, role, created_at, updated_at
            from platform_admins
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_secretariat_memberships(&self, principal_id: Uuid) -> RepositoryResult<Vec<SecretariatMembership>> {
        let rows = sqlx::query_as::<_, SecretariatMembership>(
            r#"
            select id, principal_id, secretariat_id, role_label
            from secretariat_memberships
            where principal_id = $1
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn has_teacher_class_assignment(&self, principal_id: Uuid) -> RepositoryResult<bool> {
        let exists: Option<bool> = sqlx::query_scalar(
            r#"
            select exists(
                select 1 from teacher_class_assignments where principal_id = $1
            )
            "#,
        )
        .bind(principal_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_label_roundtrips_uppercase() {
        use crate::principals::BackofficeRoleLabel;
        assert_eq!(BackofficeRoleLabel::Atendente.as_role_str(), "ATENDENTE");
        assert_eq!(BackofficeRoleLabel::Professor.as_role_str(), "PROFESSOR");
    }
}
