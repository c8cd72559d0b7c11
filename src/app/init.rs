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
use crate::alerts::governor::{AlertGovernor, Thresholds};
use crate::alerts::notifier::{Notifier, NoopNotifier, WebhookNotifier};
use crate::alerts::repository::PgAlertsRepository;
use crate::app::AppState;
use crate::app::config::AppConfig;
use crate::auth::service::AuthService;
use crate::cdn::CdnClient;
use crate::cdn::client::{NoopCdnClient, ReqwestCdnClient};
use crate::credentials::Argon2PasswordHasher;
use crate::health::repository::PgHealthRepository;
use crate::monitor::{MonitorLoop, MonitorSettings};
use crate::passkeys::ceremony::WebauthnCeremonies;
use crate::passkeys::repository::PgPasskeysRepository;
use crate::principals::repository::PgPrincipalsRepository;
use crate::provisioning::{Provisioner, ProvisioningConfig};
use crate::refresh::repository::PgRefreshRepository;
use crate::tenants::cache::ResolverCache;
use crate::tenants::repository::PgTenantsRepository;
use crate::tenants::service::TenantsService;
use crate::token::TokenService;
use anyhow::Result;
use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webauthn_rs::prelude::{Url, WebauthnBuilder};

pub fn init_subscriber() {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_max_level(Level::TRACE)
            .finish(),
    )
    .expect("setting default subscriber failed");
}

async fn healthz() -> (StatusCode, axum::Json<serde_json::Value>) {
    (StatusCode::OK, axum::Json(serde_json::json!({ "status": "ok" })))
}

fn build_webauthn(config: &AppConfig) -> Result<webauthn_rs::Webauthn> {
    let rp_origin = Url::parse(config.webauthn().relying_party_origin())?;
    let webauthn = WebauthnBuilder::new(config.webauthn().relying_party_id(), &rp_origin)?
        .rp_name(config.webauthn().relying_party_name())
        .build()?;
    Ok(webauthn)
}

fn build_cdn_client(config: &AppConfig, http: reqwest::Client) -> Arc<dyn CdnClient> {
    if config.cdn().api_base_url().is_empty() {
        return Arc::new(NoopCdnClient);
    }
    Arc::new(ReqwestCdnClient::new(
        http,
        config.cdn().api_base_url().to_string(),
        config.cdn().api_token().to_string(),
        config.cdn().doh_base_url().to_string(),
        Duration::from_secs(config.cdn().request_timeout_secs()),
    ))
}

fn build_notifier(config: &AppConfig, http: reqwest::Client) -> Arc<dyn Notifier> {
    match config.monitor().alert_webhook_url() {
        Some(url) if !url.is_empty() => Arc::new(WebhookNotifier::new(http, url.to_string())),
        _ => Arc::new(NoopNotifier),
    }
}

fn thresholds(config: &AppConfig) -> Thresholds {
    Thresholds {
        latency_warning_ms: config.monitor().latency_warning_ms(),
        latency_critical_ms: config.monitor().latency_critical_ms(),
        error_rate_warn: config.monitor().error_rate_warn(),
        error_rate_crit: config.monitor().error_rate_crit(),
        cooldown: chrono::Duration::seconds(config.monitor().alert_cooldown_secs()),
    }
}

/// Builds every collaborator, spawns the background monitor loop, and
/// assembles the merged router, following the teacher's
/// `init_default_app` shape (router merge + `TraceLayer`) minus the
/// per-tenant database-pool machinery this shared-schema design doesn't
/// need (spec.md §5, DESIGN.md).
pub async fn init_default_app() -> Result<(Arc<AppConfig>, Router, watch::Sender<bool>)> {
    let config = Arc::new(AppConfig::from_env()?);

    let pool = PgPoolOptions::new()
        .max_connections(config.database().max_pool_size())
        .acquire_timeout(Duration::from_secs(3))
        .connect(config.database().url())
        .await?;

    let http_client = reqwest::Client::new();

    let tenants_repository = Arc::new(PgTenantsRepository::new(pool.clone()));
    let refresh_repository = Arc::new(PgRefreshRepository::new(pool.clone()));
    let principals_repository = Arc::new(PgPrincipalsRepository::new(pool.clone()));
    let passkeys_repository = Arc::new(PgPasskeysRepository::new(pool.clone()));
    let health_repository = Arc::new(PgHealthRepository::new(pool.clone()));
    let alerts_repository = Arc::new(PgAlertsRepository::new(pool.clone()));

    let tenant_cache = Arc::new(ResolverCache::new(Duration::from_secs(config.cache().resolver_ttl_secs())));
    let cdn_client = build_cdn_client(&config, http_client.clone());
    let notifier = build_notifier(&config, http_client.clone());
    let password_hasher = Arc::new(Argon2PasswordHasher);
    let webauthn = Arc::new(WebauthnCeremonies::new(build_webauthn(&config)?));

    let token_service = TokenService::new(
        config.auth().jwt_secret().to_string(),
        config.auth().jwt_issuer().to_string(),
        config.auth().access_ttl_secs(),
    );

    let auth_service = Arc::new(AuthService::new(
        config.clone(),
        token_service.clone(),
        password_hasher.clone(),
        principals_repository.clone(),
        refresh_repository.clone(),
        passkeys_repository.clone(),
        webauthn.clone(),
    ));

    let tenants_service = Arc::new(TenantsService::new(tenants_repository.clone(), tenant_cache.clone()));

    let provisioning_config = ProvisioningConfig {
        zone_id: config.cdn().zone_id().to_string(),
        base_domain: config.cdn().base_domain().to_string(),
        cname_target: config.cdn().cname_target().to_string(),
        default_ttl: config.cdn().default_ttl(),
    };
    let provisioner = Arc::new(Provisioner::new(tenants_repository.clone(), cdn_client.clone(), provisioning_config));

    let governor = Arc::new(AlertGovernor::new(alerts_repository.clone(), notifier.clone()));
    let monitor_settings = MonitorSettings {
        interval: Duration::from_secs(config.monitor().interval_secs()),
        request_timeout: Duration::from_secs(config.monitor().request_timeout_secs()),
        thresholds: thresholds(&config),
    };
    let monitor_loop = MonitorLoop::new(
        tenants_repository.clone(),
        health_repository.clone(),
        governor,
        http_client.clone(),
        monitor_settings,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(monitor_loop.run(shutdown_rx));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        pool,
        tenants_repository,
        refresh_repository,
        principals_repository,
        passkeys_repository,
        tenant_cache,
        cdn_client,
        password_hasher,
        webauthn,
        http_client,
        token_service: Arc::new(token_service),
        tenants_service,
        auth_service,
        provisioner,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .merge(crate::auth::routes::public_routes(app_state.clone()))
        .merge(crate::auth::routes::authenticated_routes(app_state.clone()))
        .merge(crate::tenants::routes::saas_routes(app_state.clone()))
        .merge(crate::tenants::routes::tenant_routes(app_state.clone()))
        .layer(from_fn_with_state(app_state.clone(), crate::tenants::middleware::resolve_tenant))
        .layer(TraceLayer::new_for_http());

    Ok((config, router, shutdown_tx))
}
