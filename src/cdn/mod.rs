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
pub(crate) mod client;
pub(crate) mod doh;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A CNAME record as reported by the provider (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnameRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// The provider's native error surfaced verbatim in `details` (spec.md
/// §6 "CDN wire") — never forwarded raw past that boundary to clients.
#[derive(Debug, Error)]
pub enum CdnError {
    #[error("cdn request failed: {message}")]
    Provider { status: u16, message: String, body: Option<String> },
    #[error("cdn transport error: {0}")]
    Transport(String),
}

/// Thin typed client for a generic "DNS + zone" provider exposing CNAME
/// records (C7, spec.md §4.7). A single-method capability abstraction at
/// the `ensure_cname`/`check_propagation` call sites (spec.md §9); the
/// other methods exist for the provisioner's internal idempotency check.
#[async_trait]
pub trait CdnClient: Send + Sync {
    async fn find_cname(&self, zone_id: &str, name: &str) -> Result<Option<CnameRecord>, CdnError>;

    async fn create_cname(
        &self,
        zone_id: &str,
        name: &str,
        target: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<String, CdnError>;

    async fn update_cname(
        &self,
        zone_id: &str,
        id: &str,
        name: &str,
        target: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<(), CdnError>;

    /// Idempotent: finds the record, creates it if absent, updates it if
    /// its content differs from `target`. Always returns the record id.
    async fn ensure_cname(
        &self,
        zone_id: &str,
        name: &str,
        target: &str,
        proxied: bool,
        ttl: u32,
    ) -> Result<String, CdnError> {
        match self.find_cname(zone_id, name).await? {
            None => self.create_cname(zone_id, name, target, ttl, proxied).await,
            Some(existing) if !matches_target(&existing.content, target) || existing.proxied != proxied => {
                self.update_cname(zone_id, &existing.id, &existing.name, target, ttl, proxied).await?;
                Ok(existing.id)
            }
            Some(existing) => Ok(existing.id),
        }
    }

    /// DNS-over-HTTPS lookup with a short timeout; `true` iff any
    /// returned CNAME/A/AAAA record matches `expected_target`
    /// case-insensitively with trailing dots ignored (spec.md §4.7, §9 —
    /// wildcard-resolution results are not accepted as a match).
    async fn check_propagation(&self, name: &str, expected_target: &str) -> Result<bool, CdnError>;
}

pub(crate) fn matches_target(observed: &str, expected: &str) -> bool {
    normalize_hostname(observed) == normalize_hostname(expected)
}

pub(crate) fn normalize_hostname(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_target_ignores_case_and_trailing_dot() {
        assert!(matches_target("Edge.Example.Net.", "edge.example.net"));
        assert!(!matches_target("other.example.net", "edge.example.net"));
    }
}
