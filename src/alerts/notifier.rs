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
use crate::alerts::Alert;
use async_trait::async_trait;
use tracing::{Level, event};

/// Single-method capability abstraction for alert delivery (spec.md §9
/// "Notifier and CDN client are single-method capability abstractions").
/// Delivery failures never propagate to the alert loop (spec.md §4.10) —
/// callers log and leave the row undelivered for later reconciliation.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the channel name to record on success.
    async fn send(&self, alert: &Alert) -> Result<String, String>;
}

/// The disabled-by-configuration variant (spec.md §9), used when no
/// outbound delivery channel is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, alert: &Alert) -> Result<String, String> {
        event!(Level::DEBUG, alert_id = %alert.id, "noop notifier: alert not delivered");
        Ok("noop".to_string())
    }
}

/// Posts the alert as a JSON payload to a configured webhook URL —
/// the generic "push to an HTTP endpoint" shape most on-call tooling
/// (Slack incoming webhooks, PagerDuty's Events API, a generic ops
/// webhook) exposes.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, webhook_url: String) -> Self {
        Self { client, webhook_url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, alert: &Alert) -> Result<String, String> {
        let body = serde_json::json!({
            "alert_id": alert.id,
            "tenant_id": alert.tenant_id,
            "alert_type": alert.alert_type,
            "severity": alert.severity,
            "message": alert.message,
        });
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("webhook responded with status {}", response.status()));
        }
        Ok("webhook".to_string())
    }
}
