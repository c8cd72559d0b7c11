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
use crate::refresh::RefreshRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshRepository: Send + Sync {
    async fn insert(
        &self,
        principal_id: Uuid,
        audience: &str,
        family_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<RefreshRecord>;

    async fn get_by_hash(&self, token_hash: &str) -> RepositoryResult<Option<RefreshRecord>>;

    async fn revoke(&self, id: Uuid) -> RepositoryResult<()>;

    /// Revokes every still-active record for `(principal_id, audience)`
    /// except `except_id`, regardless of family. The spec's rotation
    /// invariant (§8) is scoped to `(subject, audience)`, not to a single
    /// family, so both login and reuse-detection revoke at this scope
    /// rather than per-family.
    async fn revoke_all_active(
        &self,
        principal_id: Uuid,
        audience: &str,
        except_id: Option<Uuid>,
    ) -> RepositoryResult<()>;

    /// Rotates a refresh record in a single transaction: revokes `old_id`,
    /// marks it replaced by the newly inserted row, inserts the new row
    /// under the same `family_id`, and revokes any other still-active
    /// record for `(principal_id, audience)`. Satisfies the "revocation
    /// and insertion occur transactionally" ordering guarantee (spec.md
    /// §5) that calling `revoke`/`insert` as separate pool round-trips
    /// cannot.
    async fn rotate(
        &self,
        old_id: Uuid,
        principal_id: Uuid,
        audience: &str,
        family_id: Uuid,
        new_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<RefreshRecord>;
}

pub struct PgRefreshRepository {
    pool: PgPool,
}

impl PgRefreshRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshRepository for PgRefreshRepository {
    async fn insert(
        &self,
        principal_id: Uuid,
        audience: &str,
        family_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<RefreshRecord> {
        let record = sqlx::query_as::<_, RefreshRecord>(
            r#"
            insert into refresh_records
                (id, principal_id, audience, family_id, token_hash, issued_at, expires_at)
            values ($1, $2, $3, $4, $5, now(), $6)
            returning id, principal_id, audience, family_id, token_hash,
                      issued_at, expires_at, replaced_by, revoked_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(principal_id)
        .bind(audience)
        .bind(family_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get_by_hash(&self, token_hash: &str) -> RepositoryResult<Option<RefreshRecord>> {
        let record = sqlx::query_as::<_, RefreshRecord>(
            r#"
            select id, principal_id, audience, family_id, token_hash,
                   issued_at, expires_at, replaced_by, revoked_at
            from refresh_records
            where token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn revoke(&self, id: Uuid) -> RepositoryResult<()> {
        sqlx::query("update refresh_records set revoked_at = now() where id = $1 and revoked_at is null")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_active(
        &self,
        principal_id: Uuid,
        audience: &str,
        except_id: Option<Uuid>,
    ) -> RepositoryResult<()> {
        sqlx::query(
            "update refresh_records set revoked_at = now() \
             where principal_id = $1 and audience = $2 and revoked_at is null and id is distinct from $3",
        )
        .bind(principal_id)
        .bind(audience)
        .bind(except_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        principal_id: Uuid,
        audience: &str,
        family_id: Uuid,
        new_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<RefreshRecord> {
        let mut tx = self.pool.begin().await?;
        let new_id = Uuid::new_v4();

        let record = sqlx::query_as::<_, RefreshRecord>(
            r#"
            insert into refresh_records
                (id, principal_id, audience, family_id, token_hash, issued_at, expires_at)
            values ($1, $2, $3, $4, $5, now(), $6)
            returning id, principal_id, audience, family_id, token_hash,
                      issued_at, expires_at, replaced_by, revoked_at
            "#,
        )
        .bind(new_id)
        .bind(principal_id)
        .bind(audience)
        .bind(family_id)
        .bind(new_token_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("update refresh_records set revoked_at = now(), replaced_by = $2 where id = $1")
            .bind(old_id)
            .bind(new_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "update refresh_records set revoked_at = now() \
             where principal_id = $1 and audience = $2 and revoked_at is null and id is distinct from $3",
        )
        .bind(principal_id)
        .bind(audience)
        .bind(new_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }
}
