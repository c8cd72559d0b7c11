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
pub(crate) mod config;
pub(crate) mod init;

use crate::auth::service::AuthService;
use crate::cdn::CdnClient;
use crate::common::ConfigProvider;
use crate::credentials::PasswordHasher;
use crate::passkeys::ceremony::WebauthnCeremonies;
use crate::passkeys::repository::PasskeysRepository;
use crate::principals::repository::PrincipalsRepository;
use crate::provisioning::Provisioner;
use crate::refresh::repository::RefreshRepository;
use crate::tenants::cache::ResolverCache;
use crate::tenants::repository::TenantsRepository;
use crate::tenants::service::TenantsService;
use crate::token::TokenService;
use config::AppConfig;
use sqlx::PgPool;
use std::sync::Arc;

/// The application's single dependency-injection root, mirroring the
/// teacher's `AppState`: every handler reaches its collaborators through
/// `Arc`-shared trait objects hung off this struct instead of global state.
/// Health/alerts repositories and the notifier are only reachable through
/// the monitor loop they were built for — no handler needs them directly,
/// so unlike `tenants_repository`/`refresh_repository` they don't get a
/// field here (mirrors the teacher only hanging a collaborator off
/// `AppState` when a handler actually reaches for it).
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub tenants_repository: Arc<dyn TenantsRepository>,
    pub refresh_repository: Arc<dyn RefreshRepository>,
    pub principals_repository: Arc<dyn PrincipalsRepository>,
    pub passkeys_repository: Arc<dyn PasskeysRepository>,
    pub tenant_cache: Arc<ResolverCache>,
    pub cdn_client: Arc<dyn CdnClient>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub webauthn: Arc<WebauthnCeremonies>,
    pub http_client: reqwest::Client,
    pub token_service: Arc<TokenService>,
    pub tenants_service: Arc<TenantsService>,
    pub auth_service: Arc<AuthService>,
    pub provisioner: Arc<Provisioner>,
}

impl ConfigProvider for AppState {
    fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}
