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
use crate::app::config::AppConfig;
use crate::auth::{AUD_BACKOFFICE, AUD_SAAS};
use crate::common::error::{ApiError, ApiErrorCode};
use crate::credentials::{PasswordHasher, generate_refresh_token, hash_refresh_token};
use crate::passkeys::PasskeyCredential;
use crate::passkeys::ceremony::{AuthOutcome, WebauthnCeremonies};
use crate::passkeys::repository::PasskeysRepository;
use crate::principals::repository::PrincipalsRepository;
use crate::refresh::repository::RefreshRepository;
use crate::token::TokenService;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use webauthn_rs::prelude::{CreationChallengeResponse, PublicKeyCredential, RegisterPublicKeyCredential, RequestChallengeResponse};

/// A fixed Argon2id hash no real password will ever match. Verifying
/// against it on an unknown-or-inactive-principal login keeps that path's
/// wall-clock cost indistinguishable from a wrong-password rejection
/// (spec.md §4.1 "the caller must not distinguish... constant-time").
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=65536,t=3,p=1$c29tZXNhbHQxMjM0NTY3OA$KC8tKz3qjq1wq1d2X1hUZ3b9B0kxwkS0F6+Q7r1mS3o";

/// What a successful login, refresh, or passkey authentication hands back
/// to the handler: a fresh access token plus the raw refresh value to
/// place in the audience's cookie (spec.md §4.6).
pub struct PrincipalTokens {
    pub access_token: String,
    pub refresh_raw: String,
    pub refresh_ttl_secs: i64,
    pub principal_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

struct LoadedPrincipal {
    id: Uuid,
    display_name: String,
    email: String,
    password_hash: String,
    active: bool,
    tenant_id: Option<Uuid>,
    roles: Vec<String>,
}

/// Orchestrates login/refresh/logout and the WebAuthn ceremonies for both
/// populations, the single entry point described in spec.md §4.6 — every
/// other auth collaborator (`TokenService`, the refresh/principals/passkeys
/// repositories, the password hasher) is a plain dependency it composes.
pub struct AuthService {
    config: Arc<AppConfig>,
    token_service: TokenService,
    password_hasher: Arc<dyn PasswordHasher>,
    principals_repository: Arc<dyn PrincipalsRepository>,
    refresh_repository: Arc<dyn RefreshRepository>,
    passkeys_repository: Arc<dyn PasskeysRepository>,
    webauthn: Arc<WebauthnCeremonies>,
}

impl AuthService {
    pub fn new(
        config: Arc<AppConfig>,
        token_service: TokenService,
        password_hasher: Arc<dyn PasswordHasher>,
        principals_repository: Arc<dyn PrincipalsRepository>,
        refresh_repository: Arc<dyn RefreshRepository>,
        passkeys_repository: Arc<dyn PasskeysRepository>,
        webauthn: Arc<WebauthnCeremonies>,
    ) -> Self {
        Self {
            config,
            token_service,
            password_hasher,
            principals_repository,
            refresh_repository,
            passkeys_repository,
            webauthn,
        }
    }

    async fn load_by_email(&self, audience: &str, email: &str) -> Result<Option<LoadedPrincipal>, ApiError> {
        match audience {
            AUD_BACKOFFICE => {
                let Some(op) = self.principals_repository.get_backoffice_by_email(email).await? else {
                    return Ok(None);
                };
                let roles = self.assemble_backoffice_roles(op.id).await?;
                Ok(Some(LoadedPrincipal {
                    id: op.id,
                    display_name: op.display_name,
                    email: op.email,
                    password_hash: op.password_hash,
                    active: op.active,
                    tenant_id: Some(op.tenant_id),
                    roles,
                }))
            }
            AUD_SAAS => {
                let Some(admin) = self.principals_repository.get_platform_admin_by_email(email).await? else {
                    return Ok(None);
                };
                Ok(Some(LoadedPrincipal {
                    id: admin.id,
                    display_name: admin.display_name,
                    email: admin.email,
                    password_hash: admin.password_hash,
                    active: admin.active,
                    tenant_id: None,
                    roles: vec![admin.role.as_role_str().to_string()],
                }))
            }
            _ => Err(ApiError::new(ApiErrorCode::InvalidCredentials, "unsupported audience")),
        }
    }

    async fn load_by_id(&self, audience: &str, id: Uuid) -> Result<Option<LoadedPrincipal>, ApiError> {
        match audience {
            AUD_BACKOFFICE => {
                let Some(op) = self.principals_repository.get_backoffice_by_id(id).await? else {
                    return Ok(None);
                };
                let roles = self.assemble_backoffice_roles(op.id).await?;
                Ok(Some(LoadedPrincipal {
                    id: op.id,
                    display_name: op.display_name,
                    email: op.email,
                    password_hash: op.password_hash,
                    active: op.active,
                    tenant_id: Some(op.tenant_id),
                    roles,
                }))
            }
            AUD_SAAS => {
                let Some(admin) = self.principals_repository.get_platform_admin_by_id(id).await? else {
                    return Ok(None);
                };
                Ok(Some(LoadedPrincipal {
                    id: admin.id,
                    display_name: admin.display_name,
                    email: admin.email,
                    password_hash: admin.password_hash,
                    active: admin.active,
                    tenant_id: None,
                    roles: vec![admin.role.as_role_str().to_string()],
                }))
            }
            _ => Err(ApiError::new(ApiErrorCode::InvalidCredentials, "unsupported audience")),
        }
    }

    /// Roles are the union of per-secretariat role labels (already
    /// uppercase via the enum) plus the virtual `PROFESSOR` role iff the
    /// principal owns any teacher↔class assignment (spec.md §4.6).
    async fn assemble_backoffice_roles(&self, principal_id: Uuid) -> Result<Vec<String>, ApiError> {
        let memberships = self.principals_repository.list_secretariat_memberships(principal_id).await?;
        let mut roles: Vec<String> = memberships.iter().map(|m| m.role_label.as_role_str().to_string()).collect();
        roles.sort();
        roles.dedup();

        if self.principals_repository.has_teacher_class_assignment(principal_id).await? {
            let professor = crate::principals::BackofficeRoleLabel::Professor.as_role_str().to_string();
            if !roles.contains(&professor) {
                roles.push(professor);
            }
        }
        Ok(roles)
    }

    async fn issue_session(&self, audience: &str, principal: LoadedPrincipal) -> Result<PrincipalTokens, ApiError> {
        let access_token = self
            .token_service
            .issue(principal.id, audience, principal.roles.clone(), principal.tenant_id)
            .map_err(|e| ApiError::internal(file!(), e))?;

        let refresh_ttl_secs = self.config.auth().refresh_ttl_secs(audience);
        let raw = generate_refresh_token();
        let expires_at = Utc::now() + Duration::seconds(refresh_ttl_secs);
        let family_id = Uuid::new_v4();

        let record = self
            .refresh_repository
            .insert(principal.id, audience, family_id, &raw.hash, expires_at)
            .await?;
        self.refresh_repository
            .revoke_all_active(principal.id, audience, Some(record.id))
            .await?;

        Ok(PrincipalTokens {
            access_token,
            refresh_raw: raw.raw,
            refresh_ttl_secs,
            principal_id: principal.id,
            display_name: principal.display_name,
            email: principal.email,
            roles: principal.roles,
        })
    }

    pub async fn login_password(&self, audience: &str, email: &str, password: &str) -> Result<PrincipalTokens, ApiError> {
        let normalized_email = email.trim().to_lowercase();
        let loaded = self.load_by_email(audience, &normalized_email).await?;

        let Some(principal) = loaded.filter(|p| p.active) else {
            let _ = self.password_hasher.verify(password, DUMMY_HASH);
            return Err(ApiError::new(ApiErrorCode::InvalidCredentials, "invalid email or password"));
        };

        if !self.password_hasher.verify(password, &principal.password_hash) {
            return Err(ApiError::new(ApiErrorCode::InvalidCredentials, "invalid email or password"));
        }
        if principal.roles.is_empty() {
            return Err(ApiError::new(ApiErrorCode::NoEligibleRoles, "principal has no eligible roles"));
        }

        self.issue_session(audience, principal).await
    }

    pub async fn refresh(&self, audience: &str, raw: &str) -> Result<PrincipalTokens, ApiError> {
        let hash = hash_refresh_token(raw);
        let record = self
            .refresh_repository
            .get_by_hash(&hash)
            .await?
            .ok_or_else(|| ApiError::new(ApiErrorCode::InvalidToken, "invalid refresh token"))?;

        if record.audience != audience {
            return Err(ApiError::new(ApiErrorCode::InvalidToken, "invalid refresh token"));
        }

        // A record carrying `revoked_at` or `replaced_by` has already been
        // spent by a prior rotation or an explicit logout. Presenting it
        // again is the refresh-reuse tell (spec.md §4.3) — revoke every
        // other still-active record for this (subject, audience) pair.
        if record.revoked_at.is_some() || record.replaced_by.is_some() {
            self.refresh_repository.revoke_all_active(record.principal_id, audience, None).await?;
            return Err(ApiError::new(ApiErrorCode::RefreshReused, "refresh token already used"));
        }
        if record.expires_at <= Utc::now() {
            return Err(ApiError::new(ApiErrorCode::InvalidToken, "refresh token expired"));
        }

        let principal = self
            .load_by_id(audience, record.principal_id)
            .await?
            .filter(|p| p.active && !p.roles.is_empty())
            .ok_or_else(|| ApiError::new(ApiErrorCode::InvalidCredentials, "principal no longer eligible"))?;

        let refresh_ttl_secs = self.config.auth().refresh_ttl_secs(audience);
        let new_raw = generate_refresh_token();
        let expires_at = Utc::now() + Duration::seconds(refresh_ttl_secs);

        self.refresh_repository
            .rotate(record.id, principal.id, audience, record.family_id, &new_raw.hash, expires_at)
            .await?;

        let access_token = self
            .token_service
            .issue(principal.id, audience, principal.roles.clone(), principal.tenant_id)
            .map_err(|e| ApiError::internal(file!(), e))?;

        Ok(PrincipalTokens {
            access_token,
            refresh_raw: new_raw.raw,
            refresh_ttl_secs,
            principal_id: principal.id,
            display_name: principal.display_name,
            email: principal.email,
            roles: principal.roles,
        })
    }

    pub async fn logout(&self, raw: &str) -> Result<(), ApiError> {
        let hash = hash_refresh_token(raw);
        if let Some(record) = self.refresh_repository.get_by_hash(&hash).await? {
            self.refresh_repository.revoke(record.id).await?;
        }
        Ok(())
    }

    pub async fn passkey_register_start(
        &self,
        principal_id: Uuid,
    ) -> Result<(Uuid, CreationChallengeResponse), ApiError> {
        let operator = self
            .principals_repository
            .get_backoffice_by_id(principal_id)
            .await?
            .ok_or_else(|| ApiError::new(ApiErrorCode::NotFound, "principal not found"))?;
        let existing = self.passkeys_repository.list_for_principal(principal_id).await?;

        let (ccr, session) = self
            .webauthn
            .start_registration(principal_id, &operator.email, &operator.display_name, &existing)
            .map_err(|e| ApiError::new(ApiErrorCode::WebauthnFailed, e))?;
        Ok((session, ccr))
    }

    pub async fn passkey_register_finish(
        &self,
        principal_id: Uuid,
        session: Uuid,
        credential: &RegisterPublicKeyCredential,
        transports: Vec<String>,
        nickname: Option<String>,
    ) -> Result<PasskeyCredential, ApiError> {
        let (credential_id, public_key, sign_count) = self
            .webauthn
            .finish_registration(session, principal_id, credential)
            .map_err(|e| ApiError::new(ApiErrorCode::WebauthnFailed, e))?;

        let mut saved = self
            .passkeys_repository
            .insert(principal_id, &credential_id, public_key, sign_count, transports, None)
            .await?;
        if nickname.is_some() {
            self.passkeys_repository.update_nickname(saved.id, nickname.as_deref()).await?;
        }
        saved.nickname = nickname;
        Ok(saved)
    }

    pub async fn passkey_login_start(
        &self,
        principal_id: Uuid,
    ) -> Result<(Uuid, RequestChallengeResponse), ApiError> {
        let credentials = self.passkeys_repository.list_for_principal(principal_id).await?;
        let (rcr, session) = self
            .webauthn
            .start_authentication(&credentials)
            .map_err(|e| ApiError::new(ApiErrorCode::WebauthnFailed, e))?;
        Ok((session, rcr))
    }

    /// Verifies the assertion, then — on success — proceeds exactly as
    /// "Login (password)" does from the point of issuing tokens (spec.md
    /// §4.6). `backoffice` is the only audience passkeys are bound to
    /// (spec.md §3 "Passkey credential — bound to a backoffice principal").
    pub async fn passkey_login_finish(
        &self,
        session: Uuid,
        credential: &PublicKeyCredential,
    ) -> Result<PrincipalTokens, ApiError> {
        let stored = self
            .passkeys_repository
            .get_by_credential_id(&credential.id)
            .await?
            .ok_or_else(|| ApiError::new(ApiErrorCode::WebauthnFailed, "unknown credential"))?;
        let candidates = self.passkeys_repository.list_for_principal(stored.principal_id).await?;

        let outcome = self
            .webauthn
            .finish_authentication(session, credential, &candidates)
            .map_err(|e| ApiError::new(ApiErrorCode::WebauthnFailed, e))?;

        let matched = match outcome {
            AuthOutcome::CloneDetected { credential } => {
                self.passkeys_repository.mark_cloned(credential.id).await?;
                return Err(ApiError::new(ApiErrorCode::CloneDetected, "passkey counter regression detected"));
            }
            AuthOutcome::Verified {
                credential,
                new_sign_count,
                public_key,
            } => {
                self.passkeys_repository
                    .update_sign_count(credential.id, public_key, new_sign_count)
                    .await?;
                credential
            }
        };

        let principal = self
            .load_by_id(AUD_BACKOFFICE, matched.principal_id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| ApiError::new(ApiErrorCode::InvalidCredentials, "principal no longer eligible"))?;
        if principal.roles.is_empty() {
            return Err(ApiError::new(ApiErrorCode::NoEligibleRoles, "principal has no eligible roles"));
        }

        self.issue_session(AUD_BACKOFFICE, principal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkeys::repository::MockPasskeysRepository;
    use crate::principals::repository::MockPrincipalsRepository;
    use crate::principals::{BackofficeOperator, BackofficeRoleLabel, SecretariatMembership};
    use crate::refresh::RefreshRecord;
    use crate::refresh::repository::MockRefreshRepository;
    use webauthn_rs::prelude::{Url, WebauthnBuilder};

    fn webauthn() -> Arc<WebauthnCeremonies> {
        let rp_origin = Url::parse("https://urbanbyte.test").unwrap();
        let webauthn = WebauthnBuilder::new("urbanbyte.test", &rp_origin)
            .unwrap()
            .rp_name("Urbanbyte")
            .build()
            .unwrap();
        Arc::new(WebauthnCeremonies::new(webauthn))
    }

    fn token_service() -> TokenService {
        TokenService::new(
            "test_jwt_secret_at_least_32_bytes!!".to_string(),
            "https://urbanbyte.test".to_string(),
            900,
        )
    }

    fn operator(id: Uuid, tenant_id: Uuid, password_hash: String, active: bool) -> BackofficeOperator {
        BackofficeOperator {
            id,
            tenant_id,
            display_name: "Maria".to_string(),
            email: "maria@cabaceiras.test".to_string(),
            password_hash,
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(
        principals: MockPrincipalsRepository,
        refresh: MockRefreshRepository,
        passkeys: MockPasskeysRepository,
    ) -> AuthService {
        AuthService::new(
            Arc::new(AppConfig::default()),
            token_service(),
            Arc::new(crate::credentials::Argon2PasswordHasher),
            Arc::new(principals),
            Arc::new(refresh),
            Arc::new(passkeys),
            webauthn(),
        )
    }

    #[tokio::test]
    async fn login_assembles_professor_role_from_teacher_assignment() {
        let principal_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let hash = crate::credentials::Argon2PasswordHasher.hash("Senha#Forte1").unwrap();

        let mut principals = MockPrincipalsRepository::new();
        let stored_hash = hash.clone();
        principals
            .expect_get_backoffice_by_email()
            .returning(move |_| Ok(Some(operator(principal_id, tenant_id, stored_hash.clone(), true))));
        principals.expect_list_secretariat_memberships().returning(move |_| {
            Ok(vec![SecretariatMembership {
                id: Uuid::new_v4(),
                principal_id,
                secretariat_id: Uuid::new_v4(),
                role_label: BackofficeRoleLabel::Atendente,
            }])
        });
        principals.expect_has_teacher_class_assignment().returning(|_| Ok(true));

        let mut refresh = MockRefreshRepository::new();
        refresh.expect_insert().returning(|principal_id, audience, family_id, hash, expires_at| {
            Ok(RefreshRecord {
                id: Uuid::new_v4(),
                principal_id,
                audience: audience.to_string(),
                family_id,
                token_hash: hash.to_string(),
                issued_at: Utc::now(),
                expires_at,
                replaced_by: None,
                revoked_at: None,
            })
        });
        refresh.expect_revoke_all_active().returning(|_, _, _| Ok(()));

        let svc = service(principals, refresh, MockPasskeysRepository::new());
        let tokens = svc.login_password(AUD_BACKOFFICE, "maria@cabaceiras.test", "Senha#Forte1").await.unwrap();

        assert_eq!(tokens.roles, vec!["ATENDENTE".to_string(), "PROFESSOR".to_string()]);
    }

    #[tokio::test]
    async fn login_fails_no_eligible_roles_without_any_membership() {
        let principal_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let hash = crate::credentials::Argon2PasswordHasher.hash("Senha#Forte1").unwrap();

        let mut principals = MockPrincipalsRepository::new();
        let stored_hash = hash.clone();
        principals
            .expect_get_backoffice_by_email()
            .returning(move |_| Ok(Some(operator(principal_id, tenant_id, stored_hash.clone(), true))));
        principals.expect_list_secretariat_memberships().returning(|_| Ok(vec![]));
        principals.expect_has_teacher_class_assignment().returning(|_| Ok(false));

        let svc = service(principals, MockRefreshRepository::new(), MockPasskeysRepository::new());
        let err = svc.login_password(AUD_BACKOFFICE, "maria@cabaceiras.test", "Senha#Forte1").await.unwrap_err();

        assert_eq!(err.code(), ApiErrorCode::NoEligibleRoles);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_without_revealing_which_check_failed() {
        let principal_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let hash = crate::credentials::Argon2PasswordHasher.hash("Senha#Forte1").unwrap();

        let mut principals = MockPrincipalsRepository::new();
        principals
            .expect_get_backoffice_by_email()
            .returning(move |_| Ok(Some(operator(principal_id, tenant_id, hash.clone(), true))));
        principals.expect_list_secretariat_memberships().returning(move |_| {
            Ok(vec![SecretariatMembership {
                id: Uuid::new_v4(),
                principal_id,
                secretariat_id: Uuid::new_v4(),
                role_label: BackofficeRoleLabel::Secretario,
            }])
        });
        principals.expect_has_teacher_class_assignment().returning(|_| Ok(false));

        let svc = service(principals, MockRefreshRepository::new(), MockPasskeysRepository::new());
        let err = svc.login_password(AUD_BACKOFFICE, "maria@cabaceiras.test", "wrong").await.unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::InvalidCredentials);
    }

    #[tokio::test]
    async fn login_unknown_email_is_indistinguishable_from_wrong_password() {
        let mut principals = MockPrincipalsRepository::new();
        principals.expect_get_backoffice_by_email().returning(|_| Ok(None));

        let svc = service(principals, MockRefreshRepository::new(), MockPasskeysRepository::new());
        let err = svc.login_password(AUD_BACKOFFICE, "ghost@cabaceiras.test", "whatever").await.unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::InvalidCredentials);
    }

    fn active_record(principal_id: Uuid, audience: &str, family_id: Uuid, hash: &str) -> RefreshRecord {
        RefreshRecord {
            id: Uuid::new_v4(),
            principal_id,
            audience: audience.to_string(),
            family_id,
            token_hash: hash.to_string(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(1),
            replaced_by: None,
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn refresh_rotates_and_issues_a_new_access_token() {
        let principal_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let raw = "raw-refresh-value";
        let hash = hash_refresh_token(raw);
        let record = active_record(principal_id, AUD_BACKOFFICE, family_id, &hash);

        let mut principals = MockPrincipalsRepository::new();
        let pw_hash = crate::credentials::Argon2PasswordHasher.hash("irrelevant").unwrap();
        principals
            .expect_get_backoffice_by_id()
            .returning(move |_| Ok(Some(operator(principal_id, tenant_id, pw_hash.clone(), true))));
        principals.expect_list_secretariat_memberships().returning(move |_| {
            Ok(vec![SecretariatMembership {
                id: Uuid::new_v4(),
                principal_id,
                secretariat_id: Uuid::new_v4(),
                role_label: BackofficeRoleLabel::Secretario,
            }])
        });
        principals.expect_has_teacher_class_assignment().returning(|_| Ok(false));

        let mut refresh = MockRefreshRepository::new();
        refresh.expect_get_by_hash().returning(move |_| Ok(Some(record.clone())));
        refresh
            .expect_rotate()
            .withf(move |old_id, _, _, fam, _, _| *old_id == record.id && *fam == family_id)
            .returning(move |_, principal_id, audience, family_id, new_hash, expires_at| {
                Ok(RefreshRecord {
                    id: Uuid::new_v4(),
                    principal_id,
                    audience: audience.to_string(),
                    family_id,
                    token_hash: new_hash.to_string(),
                    issued_at: Utc::now(),
                    expires_at,
                    replaced_by: None,
                    revoked_at: None,
                })
            });

        let svc = service(principals, refresh, MockPasskeysRepository::new());
        let tokens = svc.refresh(AUD_BACKOFFICE, raw).await.unwrap();

        assert_eq!(tokens.principal_id, principal_id);
        assert_eq!(tokens.roles, vec!["SECRETARIO".to_string()]);
        assert_ne!(tokens.refresh_raw, raw);
    }

    #[tokio::test]
    async fn refresh_reuse_of_a_revoked_token_revokes_the_whole_family() {
        let principal_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let hash = hash_refresh_token("already-spent");
        let mut record = active_record(principal_id, AUD_BACKOFFICE, family_id, &hash);
        record.revoked_at = Some(Utc::now());

        let mut refresh = MockRefreshRepository::new();
        refresh.expect_get_by_hash().returning(move |_| Ok(Some(record.clone())));
        refresh
            .expect_revoke_all_active()
            .withf(move |pid, aud, except| *pid == principal_id && aud == AUD_BACKOFFICE && except.is_none())
            .returning(|_, _, _| Ok(()));

        let svc = service(MockPrincipalsRepository::new(), refresh, MockPasskeysRepository::new());
        let err = svc.refresh(AUD_BACKOFFICE, "already-spent").await.unwrap_err();

        assert_eq!(err.code(), ApiErrorCode::RefreshReused);
    }

    #[tokio::test]
    async fn refresh_rejects_expired_token() {
        let principal_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let hash = hash_refresh_token("stale");
        let mut record = active_record(principal_id, AUD_BACKOFFICE, family_id, &hash);
        record.expires_at = Utc::now() - Duration::seconds(1);

        let mut refresh = MockRefreshRepository::new();
        refresh.expect_get_by_hash().returning(move |_| Ok(Some(record.clone())));

        let svc = service(MockPrincipalsRepository::new(), refresh, MockPasskeysRepository::new());
        let err = svc.refresh(AUD_BACKOFFICE, "stale").await.unwrap_err();

        assert_eq!(err.code(), ApiErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn refresh_rejects_audience_mismatch() {
        let principal_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let hash = hash_refresh_token("citizen-token");
        let record = active_record(principal_id, "citizen", family_id, &hash);

        let mut refresh = MockRefreshRepository::new();
        refresh.expect_get_by_hash().returning(move |_| Ok(Some(record.clone())));

        let svc = service(MockPrincipalsRepository::new(), refresh, MockPasskeysRepository::new());
        let err = svc.refresh(AUD_BACKOFFICE, "citizen-token").await.unwrap_err();

        assert_eq!(err.code(), ApiErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn logout_revokes_the_presented_refresh() {
        let principal_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let hash = hash_refresh_token("logout-me");
        let record = active_record(principal_id, AUD_BACKOFFICE, family_id, &hash);
        let record_id = record.id;

        let mut refresh = MockRefreshRepository::new();
        refresh.expect_get_by_hash().returning(move |_| Ok(Some(record.clone())));
        refresh.expect_revoke().withf(move |id| *id == record_id).returning(|_| Ok(()));

        let svc = service(MockPrincipalsRepository::new(), refresh, MockPasskeysRepository::new());
        svc.logout("logout-me").await.unwrap();
    }

    #[tokio::test]
    async fn logout_is_idempotent_on_unknown_token() {
        let mut refresh = MockRefreshRepository::new();
        refresh.expect_get_by_hash().returning(|_| Ok(None));

        let svc = service(MockPrincipalsRepository::new(), refresh, MockPasskeysRepository::new());
        svc.logout("never-issued").await.unwrap();
    }
}
