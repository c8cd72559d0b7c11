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
use crate::auth::dto::{
    LoginRequest, LoginResponse, PasskeyFinishQuery, PasskeyLoginStartRequest, PrincipalSummary,
};
use crate::auth::middleware::AuthenticatedPrincipal;
use crate::auth::service::PrincipalTokens;
use crate::auth::{AUD_BACKOFFICE, AUD_CITIZEN, AUD_SAAS, REFRESH_COOKIE_PRECEDENCE};
use crate::common::error::{ApiError, ApiErrorCode, ok};
use crate::common::extractors::ValidJson;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use webauthn_rs::prelude::{PublicKeyCredential, RegisterPublicKeyCredential};

/// Maps a login surface's path segment (`backoffice`/`cidadao`/`saas`) to
/// the internal audience string carried in claims and refresh records.
fn audience_for_path(segment: &str) -> Option<&'static str> {
    match segment {
        "backoffice" => Some(AUD_BACKOFFICE),
        "cidadao" => Some(AUD_CITIZEN),
        "saas" => Some(AUD_SAAS),
        _ => None,
    }
}

/// Refresh cookies are named after the login surface's own path segment,
/// not the internal audience constant, so `cidadao` rather than `citizen`
/// appears on the wire (spec.md §6).
fn cookie_name(audience: &str) -> &'static str {
    match audience {
        AUD_BACKOFFICE => "rt_backoffice",
        AUD_SAAS => "rt_saas",
        _ => "rt_cidadao",
    }
}

fn refresh_cookie(audience: &str, raw: String, ttl_secs: i64) -> Cookie<'static> {
    Cookie::build((cookie_name(audience), raw))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl_secs))
        .build()
}

fn expired_cookie(audience: &str) -> Cookie<'static> {
    Cookie::build((cookie_name(audience), ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

fn login_body(tokens: &PrincipalTokens) -> LoginResponse {
    LoginResponse {
        access_token: tokens.access_token.clone(),
        user: PrincipalSummary {
            id: tokens.principal_id,
            display_name: tokens.display_name.clone(),
            email: tokens.email.clone(),
        },
        roles: tokens.roles.clone(),
    }
}

pub async fn login(
    Path(path_audience): Path<String>,
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Response, Response> {
    let audience = audience_for_path(&path_audience)
        .ok_or_else(|| ApiError::new(ApiErrorCode::NotFound, "unknown login surface").into_response())?;

    let tokens = state
        .auth_service
        .login_password(audience, &payload.email, &payload.senha)
        .await
        .map_err(IntoResponse::into_response)?;

    let jar = CookieJar::new().add(refresh_cookie(audience, tokens.refresh_raw.clone(), tokens.refresh_ttl_secs));
    Ok((jar, ok(login_body(&tokens))).into_response())
}

/// Picks the cookie to rotate by `REFRESH_COOKIE_PRECEDENCE`: a client
/// should only ever carry one refresh cookie at a time, but if several are
/// present (stale browser state, population switch) the saas cookie wins.
fn find_refresh_cookie(jar: &CookieJar) -> Option<(&'static str, String)> {
    REFRESH_COOKIE_PRECEDENCE
        .iter()
        .find_map(|aud| jar.get(cookie_name(aud)).map(|c| (*aud, c.value().to_string())))
}

pub async fn refresh(jar: CookieJar, State(state): State<Arc<AppState>>) -> Result<Response, Response> {
    let (audience, raw) = find_refresh_cookie(&jar)
        .ok_or_else(|| ApiError::new(ApiErrorCode::InvalidToken, "no refresh cookie present").into_response())?;

    let tokens = state
        .auth_service
        .refresh(audience, &raw)
        .await
        .map_err(IntoResponse::into_response)?;

    let jar = jar.add(refresh_cookie(audience, tokens.refresh_raw.clone(), tokens.refresh_ttl_secs));
    Ok((jar, ok(login_body(&tokens))).into_response())
}

pub async fn logout(jar: CookieJar, State(state): State<Arc<AppState>>) -> Response {
    let Some((audience, raw)) = find_refresh_cookie(&jar) else {
        return ok(serde_json::Value::Null);
    };
    let _ = state.auth_service.logout(&raw).await;
    let jar = jar.add(expired_cookie(audience));
    (jar, ok(serde_json::Value::Null)).into_response()
}

pub async fn passkey_register_start(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<Response, Response> {
    crate::auth::middleware::require_audience(&claims, AUD_BACKOFFICE)?;
    let (session, public_key) = state
        .auth_service
        .passkey_register_start(claims.sub())
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(ok(serde_json::json!({ "session": session, "public_key": public_key })))
}

pub async fn passkey_register_finish(
    AuthenticatedPrincipal(claims): AuthenticatedPrincipal,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PasskeyFinishQuery>,
    ValidJson(credential): ValidJson<RegisterPublicKeyCredential>,
) -> Result<Response, Response> {
    crate::auth::middleware::require_audience(&claims, AUD_BACKOFFICE)?;
    let saved = state
        .auth_service
        .passkey_register_finish(claims.sub(), query.session, &credential, Vec::new(), query.nickname)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(ok(saved))
}

pub async fn passkey_login_start(
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<PasskeyLoginStartRequest>,
) -> Result<Response, Response> {
    let (session, public_key) = state
        .auth_service
        .passkey_login_start(payload.principal_id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(ok(serde_json::json!({ "session": session, "public_key": public_key })))
}

pub async fn passkey_login_finish(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PasskeyFinishQuery>,
    ValidJson(credential): ValidJson<PublicKeyCredential>,
) -> Result<Response, Response> {
    let tokens = state
        .auth_service
        .passkey_login_finish(query.session, &credential)
        .await
        .map_err(IntoResponse::into_response)?;

    let jar = CookieJar::new().add(refresh_cookie(AUD_BACKOFFICE, tokens.refresh_raw.clone(), tokens.refresh_ttl_secs));
    Ok((jar, ok(login_body(&tokens))).into_response())
}
