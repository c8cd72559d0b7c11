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
use crate::passkeys::PasskeyCredential;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasskeysRepository: Send + Sync {
    async fn list_for_principal(&self, principal_id: Uuid) -> RepositoryResult<Vec<PasskeyCredential>>;
    async fn get_by_credential_id(&self, credential_id: &str) -> RepositoryResult<Option<PasskeyCredential>>;
    async fn insert(
        &self,
        principal_id: Uuid,
        credential_id: &str,
        public_key: serde_json::Value,
        sign_count: i64,
        transports: Vec<String>,
        aaguid: Option<String>,
    ) -> RepositoryResult<PasskeyCredential>;
    /// Advances `sign_count` and refreshes `public_key` after a verified
    /// assertion (the library mutates its own internal counter bookkeeping).
    async fn update_sign_count(&self, id: Uuid, public_key: serde_json::Value, sign_count: i64) -> RepositoryResult<()>;
    /// Marks the credential permanently unusable once a non-monotonic
    /// counter has been observed (spec.md §3 invariant).
    async fn mark_cloned(&self, id: Uuid) -> RepositoryResult<()>;
    async fn update_nickname(&self, id: Uuid, nickname: Option<&str>) -> RepositoryResult<()>;
}

pub struct PgPasskeysRepository {
    pool: PgPool,
}

impl PgPasskeysRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasskeysRepository for PgPasskeysRepository {
    async fn list_for_principal(&self, principal_id: Uuid) -> RepositoryResult<Vec<PasskeyCredential>> {
        let rows = sqlx::query_as::<_, PasskeyCredential>(
            r#"
            select id, principal_id, credential_id, public_key, sign_count,
                   transports, aaguid, nickname, cloned, created_at, updated_at
            from passkey_credentials
            where principal_id = $1
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_by_credential_id(&self, credential_id: &str) -> RepositoryResult<Option<PasskeyCredential>> {
        let row = sqlx::query_as::<_, PasskeyCredential>(
            r#"
            select id, principal_id, credential_id, public_key, sign_count,
                   transports, aaguid, nickname, cloned, created_at, updated_at
            from passkey_credentials
            where credential_id = $1
            "#,
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(
        &self,
        principal_id: Uuid,
        credential_id: &str,
        public_key: serde_json::Value,
        sign_count: i64,
        transports: Vec<String>,
        aaguid: Option<String>,
    ) -> RepositoryResult<PasskeyCredential> {
        let row = sqlx::query_as::<_, PasskeyCredential>(
            r#"
            insert into passkey_credentials
                (id, principal_id, credential_id, public_key, sign_count, transports, aaguid, cloned, created_at, updated_at)
            values ($1, $2, $3, $4, $5, $6, $7, false, now(), now())
            returning id, principal_id, credential_id, public_key, sign_count,
                      transports, aaguid, nickname, cloned, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(principal_id)
        .bind(credential_id)
        .bind(public_key)
        .bind(sign_count)
        .bind(transports)
        .bind(aaguid)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_sign_count(&self, id: Uuid, public_key: serde_json::Value, sign_count: i64) -> RepositoryResult<()> {
        sqlx::query("update passkey_credentials set public_key = $2, sign_count = $3, updated_at = now() where id = $1")
            .bind(id)
            .bind(public_key)
            .bind(sign_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_cloned(&self, id: Uuid) -> RepositoryResult<()> {
        sqlx::query("update passkey_credentials set cloned = true, updated_at = now() where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_nickname(&self, id: Uuid, nickname: Option<&str>) -> RepositoryResult<()> {
        sqlx::query("update passkey_credentials set nickname = $2, updated_at = now() where id = $1")
            .bind(id)
            .bind(nickname)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
