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
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /auth/{audience}/login` request body — field names follow the
/// teacher's Portuguese-language login surface (`senha`, not `password`).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub senha: String,
}

#[derive(Debug, Serialize)]
pub struct PrincipalSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: PrincipalSummary,
    pub roles: Vec<String>,
}

/// Challenges are server-minted and bound to an opaque session id passed
/// as a query parameter on the matching finish call (spec.md §4.6).
#[derive(Debug, Deserialize)]
pub struct PasskeyFinishQuery {
    pub session: Uuid,
    pub nickname: Option<String>,
}

/// `POST /auth/passkey/login/start` request body. Passkey authentication
/// is discoverable at the protocol level, but spec.md §4.6 binds a
/// ceremony to one principal up front, so the caller names it explicitly
/// (e.g. after an email-only identification step ahead of this call).
#[derive(Debug, Deserialize)]
pub struct PasskeyLoginStartRequest {
    pub principal_id: Uuid,
}
