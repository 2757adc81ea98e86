//! EndpointRelay: turns the configured endpoint into relation data and a
//! unit status.
//!
//! Every event is evaluated from scratch against an explicit [`Snapshot`] of
//! leadership, charm configuration and the joined relations. Nothing carries
//! over between events.

use crate::config::CharmConfig;
use crate::endpoint::{self, Endpoint};
use crate::error::ProxyError;
use crate::event::{HookEvent, RelationEventKind};
use crate::relation::{ENDPOINT_KEY, RelationHandle, RelationId};
use crate::status::{StatusPool, StatusReport};

/// Inputs to one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Only the leader may write application buckets.
    pub leader: bool,
    pub config: CharmConfig,
    /// Relations of the proxy's integration that are currently joined.
    pub relations: Vec<RelationHandle>,
}

/// Outcome of a publish: which relation buckets changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub written: Vec<RelationId>,
    pub unchanged: Vec<RelationId>,
}

/// Validates the configured endpoint and republishes it on the integration.
#[derive(Debug, Clone)]
pub struct EndpointRelay {
    integration: String,
}

impl EndpointRelay {
    pub fn new(integration: impl Into<String>) -> Self {
        Self {
            integration: integration.into(),
        }
    }

    /// Name of the relation the endpoint is published on.
    pub fn integration(&self) -> &str {
        &self.integration
    }

    /// Validate a raw endpoint string.
    pub fn validate(&self, raw: &str) -> crate::Result<Endpoint> {
        Ok(endpoint::validate(raw)?)
    }

    /// Resolve the configured endpoint; blank counts as unset.
    fn configured_endpoint(&self, config: &CharmConfig) -> crate::Result<Endpoint> {
        match config.endpoint.as_deref().map(str::trim) {
            None | Some("") => Err(ProxyError::ConfigMissing),
            Some(raw) => self.validate(raw),
        }
    }

    /// Write `endpoint` into the local application bucket of every relation.
    ///
    /// Relations are independent: each is attempted, and a bucket already
    /// holding the value is left untouched.
    pub fn publish(&self, endpoint: &Endpoint, relations: &mut [RelationHandle]) -> PublishReport {
        let value = endpoint.to_string();
        let mut report = PublishReport::default();
        for relation in relations.iter_mut() {
            if relation.set(ENDPOINT_KEY, &value) {
                tracing::debug!(
                    relation = %relation.id,
                    endpoint = %value,
                    "setting NFS share endpoint"
                );
                report.written.push(relation.id.clone());
            } else {
                report.unchanged.push(relation.id.clone());
            }
        }
        report
    }

    /// Recompute relation data and unit status from the snapshot.
    pub fn evaluate(&self, snapshot: &mut Snapshot) -> StatusReport {
        let mut pool = StatusPool::new();

        let endpoint = match self.configured_endpoint(&snapshot.config) {
            Ok(endpoint) => endpoint,
            Err(ProxyError::ConfigMissing) if snapshot.config.endpoint.is_none() => {
                tracing::debug!("endpoint option is not set");
                pool.add(
                    "endpoint",
                    StatusReport::waiting("Waiting for endpoint configuration"),
                );
                return pool.resolve();
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejecting configured endpoint");
                pool.add(
                    "endpoint",
                    StatusReport::blocked(self.describe(&err, &snapshot.config)),
                );
                return pool.resolve();
            }
        };

        pool.add(
            "endpoint",
            StatusReport::active(format!("Sharing export at {}", endpoint)),
        );

        if snapshot.relations.is_empty() {
            let err = ProxyError::RelationAbsent(self.integration.clone());
            tracing::info!(endpoint = %endpoint, "{}", err);
            pool.add(
                "integration",
                StatusReport::blocked(self.describe(&err, &snapshot.config)),
            );
            return pool.resolve();
        }

        if snapshot.leader {
            let report = self.publish(&endpoint, &mut snapshot.relations);
            tracing::info!(
                endpoint = %endpoint,
                written = report.written.len(),
                unchanged = report.unchanged.len(),
                "published NFS share endpoint"
            );
        } else {
            tracing::debug!(
                endpoint = %endpoint,
                "not the leader; application data is written by the leader unit"
            );
        }

        pool.resolve()
    }

    /// Operator-facing status message for an evaluation error.
    fn describe(&self, err: &ProxyError, config: &CharmConfig) -> String {
        match err {
            ProxyError::ConfigMissing => "No configured endpoint".to_string(),
            ProxyError::ConfigMalformed(cause) => format!(
                "Invalid endpoint '{}': {}",
                config.endpoint.as_deref().unwrap_or_default().trim(),
                cause
            ),
            ProxyError::RelationAbsent(name) => format!("Waiting for {} integration", name),
            other => other.to_string(),
        }
    }

    /// Handle one event. Returns `None` for hooks that do not evaluate.
    pub fn handle(&self, event: &HookEvent, snapshot: &mut Snapshot) -> Option<StatusReport> {
        if !event.triggers_evaluation() {
            tracing::debug!(hook = %event, "nothing to do");
            return None;
        }

        let report = match event {
            HookEvent::Install => self.on_install(snapshot),
            HookEvent::ConfigChanged => self.on_config_changed(snapshot),
            HookEvent::Relation { relation, kind, id } if *relation == self.integration => {
                match kind {
                    RelationEventKind::Created | RelationEventKind::Joined => {
                        self.on_relation_joined(snapshot, id.as_ref())
                    }
                    RelationEventKind::Changed => self.on_relation_changed(snapshot, id.as_ref()),
                    RelationEventKind::Departed => {
                        self.on_relation_departed(snapshot, id.as_ref())
                    }
                    RelationEventKind::Broken => self.on_relation_broken(snapshot, id.as_ref()),
                }
            }
            _ => self.on_status_refresh(snapshot),
        };

        tracing::info!(hook = %event, status = %report, "evaluated unit status");
        Some(report)
    }

    pub fn on_install(&self, snapshot: &mut Snapshot) -> StatusReport {
        self.evaluate(snapshot)
    }

    pub fn on_config_changed(&self, snapshot: &mut Snapshot) -> StatusReport {
        tracing::debug!(endpoint = ?snapshot.config.endpoint, "endpoint configuration changed");
        self.evaluate(snapshot)
    }

    pub fn on_relation_joined(
        &self,
        snapshot: &mut Snapshot,
        id: Option<&RelationId>,
    ) -> StatusReport {
        if let Some(id) = id {
            tracing::debug!(relation = %id, "NFS client integrated");
        }
        self.evaluate(snapshot)
    }

    /// Logs the share the client asked for; the export is managed outside
    /// the model, so the configured endpoint is published regardless.
    pub fn on_relation_changed(
        &self,
        snapshot: &mut Snapshot,
        id: Option<&RelationId>,
    ) -> StatusReport {
        for relation in snapshot
            .relations
            .iter()
            .filter(|relation| id.is_none_or(|id| relation.id == *id))
        {
            if let Some(request) = relation.share_request() {
                tracing::debug!(
                    relation = %relation.id,
                    name = %request.name,
                    allowlist = ?request.allowlist,
                    size_gb = ?request.size_gb,
                    "NFS share requested"
                );
                if request.is_restricted() {
                    tracing::warn!(
                        relation = %relation.id,
                        "ignoring requested allowlist and size; the export is managed externally"
                    );
                }
            }
        }
        self.evaluate(snapshot)
    }

    pub fn on_relation_departed(
        &self,
        snapshot: &mut Snapshot,
        id: Option<&RelationId>,
    ) -> StatusReport {
        if let Some(id) = id {
            tracing::debug!(relation = %id, "NFS client unit departed");
        }
        self.evaluate(snapshot)
    }

    /// The broken relation is gone; evaluate without it.
    pub fn on_relation_broken(
        &self,
        snapshot: &mut Snapshot,
        id: Option<&RelationId>,
    ) -> StatusReport {
        if let Some(id) = id {
            tracing::debug!(relation = %id, "NFS client integration removed");
            snapshot.relations.retain(|relation| relation.id != *id);
        }
        self.evaluate(snapshot)
    }

    /// Start, upgrade, leadership and update-status hooks.
    pub fn on_status_refresh(&self, snapshot: &mut Snapshot) -> StatusReport {
        self.evaluate(snapshot)
    }
}
