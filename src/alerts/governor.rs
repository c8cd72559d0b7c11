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
use crate::alerts::notifier::Notifier;
use crate::alerts::repository::AlertsRepository;
use crate::alerts::{AlertType, Severity};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{Level, event};
use uuid::Uuid;

/// Thresholds the governor evaluates each tick (spec.md §4.10). A
/// threshold `<= 0` disables its branch entirely (spec.md §8).
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub latency_warning_ms: i64,
    pub latency_critical_ms: i64,
    pub error_rate_warn: f64,
    pub error_rate_crit: f64,
    pub cooldown: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    alert_type: AlertType,
    severity: Severity,
    value: CandidateValue,
}

#[derive(Debug, Clone, Copy)]
enum CandidateValue {
    LatencyMs(i64),
    ErrorRatePct(f64),
}

/// Threshold evaluation, per-tenant/per-type throttling, and delivery via
/// the external notifier (C10, spec.md §4.10). Only the highest-matching
/// severity per alert-type is emitted per tick.
pub struct AlertGovernor {
    repository: Arc<dyn AlertsRepository>,
    notifier: Arc<dyn Notifier>,
}

impl AlertGovernor {
    pub fn new(repository: Arc<dyn AlertsRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repository, notifier }
    }

    /// Evaluates the rules for one tenant tick and emits whichever
    /// candidates survive throttling. `response_ms` is the latest probe's
    /// response time, if the probe produced one; `error_rate_pct` is the
    /// trailing-24h error rate as a percentage in [0, 100].
    pub async fn evaluate(
        &self,
        tenant_id: Uuid,
        response_ms: Option<i64>,
        error_rate_pct: f64,
        thresholds: Thresholds,
    ) {
        for candidate in Self::candidates(response_ms, error_rate_pct, thresholds) {
            self.emit_if_not_throttled(tenant_id, candidate, thresholds.cooldown).await;
        }
    }

    fn candidates(response_ms: Option<i64>, error_rate_pct: f64, thresholds: Thresholds) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(2);

        if let Some(ms) = response_ms {
            if thresholds.latency_critical_ms > 0 && ms > thresholds.latency_critical_ms {
                out.push(Candidate {
                    alert_type: AlertType::Latency,
                    severity: Severity::Critical,
                    value: CandidateValue::LatencyMs(ms),
                });
            } else if thresholds.latency_warning_ms > 0 && ms > thresholds.latency_warning_ms {
                out.push(Candidate {
                    alert_type: AlertType::Latency,
                    severity: Severity::Warning,
                    value: CandidateValue::LatencyMs(ms),
                });
            }
        }

        let error_rate_fraction = error_rate_pct / 100.0;
        if thresholds.error_rate_crit > 0.0 && error_rate_fraction >= thresholds.error_rate_crit {
            out.push(Candidate {
                alert_type: AlertType::ErrorRate,
                severity: Severity::Critical,
                value: CandidateValue::ErrorRatePct(error_rate_pct),
            });
        } else if thresholds.error_rate_warn > 0.0 && error_rate_fraction >= thresholds.error_rate_warn {
            out.push(Candidate {
                alert_type: AlertType::ErrorRate,
                severity: Severity::Warning,
                value: CandidateValue::ErrorRatePct(error_rate_pct),
            });
        }

        out
    }

    async fn emit_if_not_throttled(&self, tenant_id: Uuid, candidate: Candidate, cooldown: Duration) {
        let latest = match self.repository.latest_for_tenant_and_type(tenant_id, candidate.alert_type).await {
            Ok(latest) => latest,
            Err(e) => {
                event!(Level::ERROR, tenant_id = %tenant_id, error = %e, "failed to read alert throttle state");
                return;
            }
        };

        if let Some(latest) = latest
            && Utc::now() - latest.triggered_at < cooldown
        {
            return;
        }

        let message = match candidate.value {
            CandidateValue::LatencyMs(ms) => format!("response time {ms}ms exceeds {:?} threshold", candidate.severity),
            CandidateValue::ErrorRatePct(pct) => format!("error rate {pct:.2}% exceeds {:?} threshold", candidate.severity),
        };
        let metadata = match candidate.value {
            CandidateValue::LatencyMs(ms) => serde_json::json!({ "response_ms": ms }),
            CandidateValue::ErrorRatePct(pct) => serde_json::json!({ "error_rate_pct": pct }),
        };

        let alert = match self
            .repository
            .insert(Some(tenant_id), candidate.alert_type, candidate.severity, &message, metadata)
            .await
        {
            Ok(alert) => alert,
            Err(e) => {
                event!(Level::ERROR, tenant_id = %tenant_id, error = %e, "failed to persist alert");
                return;
            }
        };

        match self.notifier.send(&alert).await {
            Ok(channel) => {
                if let Err(e) = self.repository.mark_delivered(alert.id, &channel, Utc::now()).await {
                    event!(Level::ERROR, alert_id = %alert.id, error = %e, "failed to mark alert delivered");
                }
            }
            Err(e) => {
                // Left `delivered = false` for later reconciliation, per
                // spec.md §4.10 — this is not re-raised to the loop.
                event!(Level::WARN, alert_id = %alert.id, error = %e, "alert delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::repository::MockAlertsRepository;
    use crate::alerts::{Alert, AlertType, Severity};
    use mockall::predicate::*;

    fn thresholds() -> Thresholds {
        Thresholds {
            latency_warning_ms: 500,
            latency_critical_ms: 2000,
            error_rate_warn: 0.10,
            error_rate_crit: 0.30,
            cooldown: Duration::minutes(30),
        }
    }

    struct NullNotifier;
    #[async_trait::async_trait]
    impl Notifier for NullNotifier {
        async fn send(&self, _alert: &Alert) -> Result<String, String> {
            Ok("test".to_string())
        }
    }

    #[test]
    fn latency_warning_fires_between_thresholds() {
        let candidates = AlertGovernor::candidates(Some(1500), 0.0, thresholds());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alert_type, AlertType::Latency);
        assert_eq!(candidates[0].severity, Severity::Warning);
    }

    #[test]
    fn latency_critical_supersedes_warning() {
        let candidates = AlertGovernor::candidates(Some(3000), 0.0, thresholds());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].severity, Severity::Critical);
    }

    #[test]
    fn disabled_threshold_produces_no_candidate() {
        let mut t = thresholds();
        t.latency_warning_ms = 0;
        t.latency_critical_ms = 0;
        let candidates = AlertGovernor::candidates(Some(999_999), 0.0, t);
        assert!(candidates.iter().all(|c| c.alert_type != AlertType::Latency));
    }

    #[test]
    fn error_rate_candidate_uses_percent_threshold() {
        let candidates = AlertGovernor::candidates(None, 15.0, thresholds());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alert_type, AlertType::ErrorRate);
        assert_eq!(candidates[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn suppresses_when_latest_within_cooldown() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockAlertsRepository::new();
        repo.expect_latest_for_tenant_and_type()
            .with(eq(tenant_id), eq(AlertType::Latency))
            .returning(move |_, _| {
                Ok(Some(Alert {
                    id: Uuid::new_v4(),
                    tenant_id: Some(tenant_id),
                    alert_type: AlertType::Latency,
                    severity: Severity::Warning,
                    message: "prior".to_string(),
                    triggered_at: Utc::now(),
                    delivered: false,
                    delivery_channel: None,
                    delivered_at: None,
                    metadata: serde_json::json!({}),
                }))
            });
        repo.expect_insert().times(0);

        let governor = AlertGovernor::new(Arc::new(repo), Arc::new(NullNotifier));
        governor.evaluate(tenant_id, Some(1500), 0.0, thresholds()).await;
    }

    #[tokio::test]
    async fn emits_when_no_prior_alert() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockAlertsRepository::new();
        repo.expect_latest_for_tenant_and_type().returning(|_, _| Ok(None));
        repo.expect_insert().times(1).returning(move |_, alert_type, severity, message, metadata| {
            Ok(Alert {
                id: Uuid::new_v4(),
                tenant_id: Some(tenant_id),
                alert_type,
                severity,
                message: message.to_string(),
                triggered_at: Utc::now(),
                delivered: false,
                delivery_channel: None,
                delivered_at: None,
                metadata,
            })
        });
        repo.expect_mark_delivered().times(1).returning(|_, _, _| Ok(()));

        let governor = AlertGovernor::new(Arc::new(repo), Arc::new(NullNotifier));
        governor.evaluate(tenant_id, Some(1500), 0.0, thresholds()).await;
    }
}
