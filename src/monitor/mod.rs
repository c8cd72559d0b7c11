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
use crate::health::repository::{HealthRepository, NewCheckEvent};
use crate::health::compute_aggregates;
use crate::tenants::Tenant;
use crate::tenants::repository::TenantsRepository;
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::watch;
use tracing::{Level, event};

/// Configuration the loop needs each tick, independent of `AppConfig`'s
/// shape so the loop stays testable against fakes.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub interval: StdDuration,
    pub request_timeout: StdDuration,
    pub thresholds: Thresholds,
}

/// One background ticker per process (C9, spec.md §4.9): probes every
/// tenant's `/ready` endpoint, records the result, rolls up a 24h
/// snapshot, and hands the numbers to the alert governor. Runs once
/// immediately at startup, then on every tick, until `shutdown` fires.
pub struct MonitorLoop {
    tenants_repository: Arc<dyn TenantsRepository>,
    health_repository: Arc<dyn HealthRepository>,
    governor: Arc<AlertGovernor>,
    http: reqwest::Client,
    settings: MonitorSettings,
}

impl MonitorLoop {
    pub fn new(
        tenants_repository: Arc<dyn TenantsRepository>,
        health_repository: Arc<dyn HealthRepository>,
        governor: Arc<AlertGovernor>,
        http: reqwest::Client,
        settings: MonitorSettings,
    ) -> Self {
        Self { tenants_repository, health_repository, governor, http, settings }
    }

    /// Drives the loop until `shutdown` is signalled. In-flight probes
    /// respect `request_timeout`; the loop itself respects `shutdown` at
    /// each tick boundary rather than mid-probe, since per-probe work is
    /// already bounded by its own deadline.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            self.tick().await;

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        event!(Level::INFO, "monitor loop shutting down");
                        return;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let tenants = match self.tenants_repository.list().await {
            Ok(tenants) => tenants,
            Err(e) => {
                event!(Level::ERROR, error = %e, "monitor loop failed to list tenants");
                return;
            }
        };

        for tenant in tenants {
            self.probe_tenant(&tenant).await;
        }
    }

    async fn probe_tenant(&self, tenant: &Tenant) {
        let url = format!("https://{}/ready", tenant.domain);
        let started = Instant::now();
        let outcome = self.http.get(&url).timeout(self.settings.request_timeout).send().await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let new_event = match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                NewCheckEvent {
                    tenant_id: tenant.id,
                    source: "monitor".to_string(),
                    status_code: Some(status as i32),
                    response_ms: Some(elapsed_ms),
                    success: (200..400).contains(&status),
                    error: None,
                    metadata: serde_json::json!({}),
                }
            }
            Err(e) => NewCheckEvent {
                tenant_id: tenant.id,
                source: "monitor".to_string(),
                status_code: None,
                response_ms: None,
                success: false,
                error: Some(e.to_string()),
                metadata: serde_json::json!({}),
            },
        };

        let latest_response_ms = new_event.response_ms;

        if let Err(e) = self.health_repository.insert_check_event(new_event).await {
            event!(Level::ERROR, tenant_id = %tenant.id, error = %e, "failed to persist check event");
            return;
        }

        self.roll_up_and_alert(tenant, latest_response_ms).await;
    }

    async fn roll_up_and_alert(&self, tenant: &Tenant, latest_response_ms: Option<i64>) {
        let since = Utc::now() - Duration::hours(24);
        let events = match self.health_repository.list_events_since(tenant.id, since).await {
            Ok(events) => events,
            Err(e) => {
                event!(Level::ERROR, tenant_id = %tenant.id, error = %e, "failed to read check event window");
                return;
            }
        };

        let aggregates = compute_aggregates(&events);

        if let Err(e) = self
            .health_repository
            .upsert_snapshot(
                tenant.id,
                aggregates.uptime_pct,
                aggregates.error_rate_pct,
                aggregates.p95_response_ms,
                aggregates.last_status,
                Some(Utc::now()),
                tenant.dns_status,
            )
            .await
        {
            event!(Level::ERROR, tenant_id = %tenant.id, error = %e, "failed to upsert health snapshot");
        }

        self.governor
            .evaluate(tenant.id, latest_response_ms, aggregates.error_rate_pct, self.settings.thresholds)
            .await;
    }
}

