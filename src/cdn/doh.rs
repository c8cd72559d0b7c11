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
use crate::cdn::CdnError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(default, rename = "Answer")]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "data")]
    data: String,
}

/// DNS-over-HTTPS lookups against a RFC 8484 JSON-format resolver
/// (the `application/dns-json` shape most public resolvers — Google,
/// Cloudflare — expose), used by the propagation check (spec.md §4.7).
pub struct DohClient {
    http: reqwest::Client,
    base_url: String,
}

impl DohClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Returns the raw `data` field of every answer record for `record_type`
    /// (one of `"CNAME"`, `"A"`, `"AAAA"`) on `name`, with a per-call
    /// timeout independent of the shared client's default.
    pub async fn lookup(&self, name: &str, record_type: &str, timeout: Duration) -> Result<Vec<String>, CdnError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("name", name), ("type", record_type)])
            .header("accept", "application/dns-json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| CdnError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CdnError::Transport(format!("doh lookup returned status {}", response.status())));
        }

        let body: DohResponse = response.json().await.map_err(|e| CdnError::Transport(e.to_string()))?;
        Ok(body.answer.into_iter().map(|a| a.data).collect())
    }
}
