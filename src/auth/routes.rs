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
use crate::app::AppState;
use crate::auth::handler::{login, logout, passkey_login_finish, passkey_login_start, passkey_register_finish, passkey_register_start, refresh};
use crate::auth::middleware::require_auth;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use std::sync::Arc;

/// Unauthenticated login/refresh/logout and the passkey-login ceremony —
/// none of these can require a bearer token, since they are how one is
/// obtained in the first place (spec.md §6, §4.6).
pub fn public_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/{audience}/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/passkey/login/start", post(passkey_login_start))
        .route("/auth/passkey/login/finish", post(passkey_login_finish))
        .with_state(state)
}

/// Passkey *registration* is a backoffice operator managing their own
/// credentials, so it sits behind `require_auth` unlike the login ceremony.
pub fn authenticated_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/passkey/register/start", post(passkey_register_start))
        .route("/auth/passkey/register/finish", post(passkey_register_finish))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
