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
use crate::common::error::ApiError;
use crate::tenants::Tenant;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Endpoints that don't belong to a tenant and bypass host resolution —
/// platform liveness, refresh (audience inferred from cookie, not host),
/// the platform-admin login surface, and the platform-admin tenant-registry
/// API itself (`/saas/tenants*` has to work before any tenant's host can
/// resolve to anything). Grounded in spec.md §4.11's allowlist.
const NON_TENANT_PREFIXES: &[&str] = &[
    "/healthz",
    "/auth/refresh",
    "/auth/saas",
    "/auth/passkey/saas",
    "/saas",
];

fn host_without_port(host: &str) -> &str {
    host.rsplit_once(':').map_or(host, |(h, _)| h)
}

/// Resolves the request's `Host` header to a tenant (C11), consulting the
/// resolver cache before falling back to the tenants repository, the same
/// "check cache, then consult the backing store" shape as the teacher's
/// `PgPoolManager::get_tenant_pool`. A miss or an inactive tenant yields a
/// flat `not_found` — there is no default tenant (spec.md §4.11).
pub async fn resolve_tenant(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let path = req.uri().path();
    if NON_TENANT_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return Ok(next.run(req).await);
    }

    let host = req
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| host_without_port(h).trim_end_matches('.').to_lowercase())
        .ok_or_else(|| StatusCode::BAD_REQUEST.into_response())?;

    let tenant = match state.tenant_cache.get(&host) {
        Some(tenant) => Some(tenant),
        None => {
            let tenant = state
                .tenants_repository
                .get_by_domain(&host)
                .await
                .map_err(|e| ApiError::from(e).into_response())?;
            if let Some(ref tenant) = tenant {
                state.tenant_cache.put(host.clone(), tenant.clone());
            }
            tenant
        }
    };

    let Some(tenant) = tenant else {
        return Err((StatusCode::NOT_FOUND, "No tenant resolves to this host").into_response());
    };
    if !tenant.is_active() {
        return Err((StatusCode::NOT_FOUND, "No tenant resolves to this host").into_response());
    }

    req.extensions_mut().insert(Arc::new(tenant));
    Ok(next.run(req).await)
}

pub struct ResolvedTenant(pub Arc<Tenant>);

impl<S> FromRequestParts<S> for ResolvedTenant
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Tenant>>()
            .cloned()
            .map(ResolvedTenant)
            .ok_or_else(|| (StatusCode::NOT_FOUND, "No tenant resolved for this request").into_response())
    }
}
