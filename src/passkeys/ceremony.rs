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
use crate::passkeys::PasskeyCredential;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;
use webauthn_rs::prelude::{
    CreationChallengeResponse, Passkey, PasskeyAuthentication, PasskeyRegistration,
    PublicKeyCredential, RegisterPublicKeyCredential, RequestChallengeResponse, Webauthn,
};

/// How long a minted challenge is redeemable. The spec only says "short-
/// lived"; five minutes covers a human completing a platform prompt
/// without leaving enough window for a replay after the user gives up.
const CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

enum ChallengeState {
    Registration { principal_id: Uuid, state: PasskeyRegistration },
    Authentication { principal_id: Uuid, state: PasskeyAuthentication },
}

struct Entry {
    state: ChallengeState,
    expires_at: DateTime<Utc>,
}

/// Holds in-flight WebAuthn ceremony state keyed by an opaque session id,
/// the same "bounded-TTL map behind a lock" shape as
/// `crate::tenants::cache::ResolverCache`, generalized from host→tenant to
/// session→ceremony-state since both are short-lived server-side context
/// bound to an opaque key handed to the client (spec.md §4.6 "bound to a
/// short-lived server session").
pub struct ChallengeStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn put(&self, state: ChallengeState) -> Uuid {
        let session = Uuid::new_v4();
        let mut entries = self.entries.write().expect("challenge store lock poisoned");
        entries.insert(
            session,
            Entry {
                state,
                expires_at: Utc::now() + CHALLENGE_TTL,
            },
        );
        session
    }

    fn take(&self, session: Uuid) -> Option<ChallengeState> {
        let mut entries = self.entries.write().expect("challenge store lock poisoned");
        let entry = entries.remove(&session)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        Some(entry.state)
    }
}

impl Default for ChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn credential_id_to_string(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The outcome of a verified assertion: the matched stored credential and
/// the state it should be persisted with next.
pub enum AuthOutcome {
    Verified {
        credential: PasskeyCredential,
        new_sign_count: i64,
        public_key: serde_json::Value,
    },
    CloneDetected { credential: PasskeyCredential },
}

/// Thin wrapper around `webauthn_rs::Webauthn` translating between the
/// library's opaque `Passkey` state and the spec's own
/// `PasskeyCredential` row shape (spec.md §4.6).
pub struct WebauthnCeremonies {
    webauthn: Webauthn,
    challenges: ChallengeStore,
}

impl WebauthnCeremonies {
    pub fn new(webauthn: Webauthn) -> Self {
        Self {
            webauthn,
            challenges: ChallengeStore::new(),
        }
    }

    pub fn start_registration(
        &self,
        principal_id: Uuid,
        email: &str,
        display_name: &str,
        existing: &[PasskeyCredential],
    ) -> Result<(CreationChallengeResponse, Uuid), String> {
        let exclude = existing
            .iter()
            .filter_map(|c| {
                serde_json::from_value::<Passkey>(c.public_key.clone())
                    .ok()
                    .map(|pk| pk.cred_id().clone())
            })
            .collect::<Vec<_>>();

        let (ccr, state) = self
            .webauthn
            .start_passkey_registration(principal_id, email, display_name, Some(exclude))
            .map_err(|e| e.to_string())?;

        let session = self.challenges.put(ChallengeState::Registration { principal_id, state });
        Ok((ccr, session))
    }

    pub fn finish_registration(
        &self,
        session: Uuid,
        principal_id: Uuid,
        credential: &RegisterPublicKeyCredential,
    ) -> Result<(String, serde_json::Value, i64), String> {
        let ChallengeState::Registration { principal_id: bound_principal, state } =
            self.challenges.take(session).ok_or("challenge expired or unknown")?
        else {
            return Err("session was not a registration ceremony".to_string());
        };
        if bound_principal != principal_id {
            return Err("challenge does not belong to this principal".to_string());
        }

        let passkey = self
            .webauthn
            .finish_passkey_registration(credential, &state)
            .map_err(|e| e.to_string())?;

        let credential_id = credential_id_to_string(passkey.cred_id().as_ref());
        let sign_count = passkey.counter() as i64;
        let public_key = serde_json::to_value(&passkey).map_err(|e| e.to_string())?;
        Ok((credential_id, public_key, sign_count))
    }

    pub fn start_authentication(
        &self,
        credentials: &[PasskeyCredential],
    ) -> Result<(RequestChallengeResponse, Uuid), String> {
        let passkeys = credentials
            .iter()
            .filter(|c| c.usable())
            .filter_map(|c| serde_json::from_value::<Passkey>(c.public_key.clone()).ok())
            .collect::<Vec<_>>();
        if passkeys.is_empty() {
            return Err("no usable passkeys for this principal".to_string());
        }

        let (rcr, state) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(|e| e.to_string())?;

        // principal_id is not known at this point (discoverable ceremony
        // starts from credential ids alone); it is recovered from the
        // matched stored credential when the ceremony finishes.
        let session = self.challenges.put(ChallengeState::Authentication {
            principal_id: Uuid::nil(),
            state,
        });
        Ok((rcr, session))
    }

    pub fn finish_authentication(
        &self,
        session: Uuid,
        credential: &PublicKeyCredential,
        stored: &[PasskeyCredential],
    ) -> Result<AuthOutcome, String> {
        let ChallengeState::Authentication { state, .. } =
            self.challenges.take(session).ok_or("challenge expired or unknown")?
        else {
            return Err("session was not an authentication ceremony".to_string());
        };

        let result = self
            .webauthn
            .finish_passkey_authentication(credential, &state)
            .map_err(|e| e.to_string())?;

        let credential_id = credential_id_to_string(result.cred_id().as_ref());
        let matched = stored
            .iter()
            .find(|c| c.credential_id == credential_id)
            .cloned()
            .ok_or("assertion did not match a known credential")?;

        let observed_counter = result.counter() as i64;
        if observed_counter <= matched.sign_count {
            return Ok(AuthOutcome::CloneDetected { credential: matched });
        }

        let mut passkey: Passkey =
            serde_json::from_value(matched.public_key.clone()).map_err(|e| e.to_string())?;
        passkey.update_credential(&result);
        let public_key = serde_json::to_value(&passkey).map_err(|e| e.to_string())?;

        Ok(AuthOutcome::Verified {
            credential: matched,
            new_sign_count: observed_counter,
            public_key,
        })
    }
}
