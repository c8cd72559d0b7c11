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
use crate::auth::AUD_SAAS;
use crate::auth::middleware::{AuthenticatedPrincipal, require_audience};
use crate::common::error::{ApiError, created, ok};
use crate::common::extractors::ValidJson;
use crate::tenants::dto::{CreateTenantRequest, TenantResponse, UpdateTenantSettingsRequest};
use crate::tenants::repository::NewTenant;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use uuid::Uuid;

pub async fn create(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<CreateTenantRequest>,
) -> Result<Response, Response> {
    require_audience(&claims, AUD_SAAS)?;
    let input = NewTenant {
        slug: payload.slug,
        domain: payload.domain,
        display_name: payload.display_name,
        contact: payload.contact,
        theme: payload.theme,
        settings: payload.settings,
        logo_url: payload.logo_url,
        notes: payload.notes,
    };
    let tenant = state
        .tenants_service
        .create(input)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    Ok(created(TenantResponse::from(tenant)))
}

pub async fn list(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<Response, Response> {
    require_audience(&claims, AUD_SAAS)?;
    let tenants = state
        .tenants_service
        .list()
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    let out: Vec<TenantResponse> = tenants.into_iter().map(TenantResponse::from).collect();
    Ok(ok(out))
}

pub async fn update_settings(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateTenantSettingsRequest>,
) -> Result<Response, Response> {
    require_audience(&claims, AUD_SAAS)?;
    let tenant = state
        .tenants_service
        .update_settings(id, payload.contact.as_ref(), payload.theme.as_ref(), payload.settings.as_ref())
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    Ok(ok(TenantResponse::from(tenant)))
}

pub async fn provision(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, Response> {
    require_audience(&claims, AUD_SAAS)?;
    let tenant = state
        .provisioner
        .provision_tenant(id, state.config.cdn().proxied_default())
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    Ok(ok(TenantResponse::from(tenant)))
}

pub async fn check_dns(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, Response> {
    require_audience(&claims, AUD_SAAS)?;
    let tenant = state
        .provisioner
        .check_tenant(id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    Ok(ok(TenantResponse::from(tenant)))
}

pub async fn get_current_tenant(
    crate::tenants::middleware::ResolvedTenant(tenant): crate::tenants::middleware::ResolvedTenant,
) -> Response {
    ok(TenantResponse::from((*tenant).clone()))
}
