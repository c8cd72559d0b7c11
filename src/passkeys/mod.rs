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
pub(crate) mod ceremony;
pub(crate) mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WebAuthn credential bound to a backoffice principal (spec.md §3).
/// `public_key` holds the serialized `webauthn_rs` passkey state — the COSE
/// key plus the bookkeeping webauthn-rs itself needs to verify the next
/// assertion — rather than a bare COSE blob, since re-deriving verification
/// state from raw COSE bytes on every login is exactly what the library
/// exists to avoid.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasskeyCredential {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub credential_id: String,
    pub public_key: serde_json::Value,
    pub sign_count: i64,
    pub transports: Vec<String>,
    pub aaguid: Option<String>,
    pub nickname: Option<String>,
    pub cloned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PasskeyCredential {
    pub fn usable(&self) -> bool {
        !self.cloned
    }
}
