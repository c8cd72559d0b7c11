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
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bearer access-token claims. Generalizes the teacher's single-audience
/// `Claims` (`manager/auth/dto/claims.rs`) to the spec's `{sub, aud,
/// roles[], jti, iat, exp}` shape: one audience string per login surface
/// (`citizen` / `backoffice` / `saas`) plus a role list assembled at login.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Claims {
    sub: Uuid,
    iss: String,
    aud: String,
    roles: Vec<String>,
    tenant_id: Option<Uuid>,
    jti: Uuid,
    iat: usize,
    nbf: usize,
    exp: usize,
}

impl Claims {
    pub fn sub(&self) -> Uuid {
        self.sub
    }
    pub fn aud(&self) -> &str {
        &self.aud
    }
    pub fn roles(&self) -> &[String] {
        &self.roles
    }
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }
    pub fn jti(&self) -> Uuid {
        self.jti
    }
}

/// Encodes/decodes access tokens against the configured HMAC secret and
/// issuer. Holding the secret/issuer here instead of passing them to every
/// call site mirrors the teacher's claims ceremony in
/// `manager/auth/dto/claims.rs`, adapted from `aud`-as-config to
/// `aud`-as-argument since this service issues tokens for three audiences.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    issuer: String,
    access_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: String, issuer: String, access_ttl_secs: i64) -> Self {
        Self {
            secret,
            issuer,
            access_ttl: Duration::seconds(access_ttl_secs),
        }
    }

    pub fn issue(
        &self,
        sub: Uuid,
        aud: &str,
        roles: Vec<String>,
        tenant_id: Option<Uuid>,
    ) -> Result<String, String> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            iss: self.issuer.clone(),
            aud: aud.to_string(),
            roles,
            tenant_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp() as usize,
            nbf: now.timestamp() as usize,
            exp: (now + self.access_ttl).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| "could not encode token".to_string())
    }

    pub fn validate(&self, token: &str, expected_aud: &str) -> Result<Claims, String> {
        let mut validator = Validation::new(Algorithm::HS256);
        validator.validate_nbf = true;
        validator.set_issuer(&[&self.issuer]);
        validator.set_audience(&[expected_aud]);
        validator.set_required_spec_claims(&["sub", "exp", "iat", "nbf", "iss", "aud", "jti"]);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validator,
        )
        .map(|data| data.claims)
        .map_err(|_| "invalid token".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "test_jwt_secret_at_least_32_bytes!!".to_string(),
            "https://urbanbyte.test".to_string(),
            900,
        )
    }

    #[test]
    fn issues_and_validates_roundtrip() {
        let svc = service();
        let sub = Uuid::new_v4();
        let token = svc
            .issue(sub, "backoffice", vec!["secretariat:permits".to_string()], None)
            .unwrap();
        let claims = svc.validate(&token, "backoffice").unwrap();
        assert_eq!(claims.sub(), sub);
        assert!(claims.has_role("secretariat:permits"));
    }

    #[test]
    fn rejects_wrong_audience() {
        let svc = service();
        let token = svc.issue(Uuid::new_v4(), "citizen", vec![], None).unwrap();
        assert!(svc.validate(&token, "backoffice").is_err());
    }

    #[test]
    fn carries_active_tenant() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let token = svc
            .issue(Uuid::new_v4(), "saas", vec!["platform_admin".to_string()], Some(tenant))
            .unwrap();
        let claims = svc.validate(&token, "saas").unwrap();
        assert_eq!(claims.tenant_id(), Some(tenant));
    }
}
