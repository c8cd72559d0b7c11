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
use crate::auth::middleware::require_auth;
use crate::tenants::handler::{check_dns, create, get_current_tenant, list, provision, update_settings};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use std::sync::Arc;

/// `/saas/tenants` — platform-administrator surface over the tenant
/// registry and provisioning workflow (spec.md §6).
pub fn saas_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/saas/tenants", post(create).get(list))
        .route("/saas/tenants/{id}", patch(update_settings))
        .route("/saas/tenants/{id}/provision", post(provision))
        .route("/saas/tenants/{id}/dns/check", post(check_dns))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

/// `GET /tenant` — resolve the current tenant from the request's host,
/// no platform-admin auth required (the host middleware already gated
/// resolution).
pub fn tenant_routes(state: Arc<AppState>) -> Router {
    Router::new().route("/tenant", get(get_current_tenant)).with_state(state)
}
