//! Hook execution against the orchestration runtime.
//!
//! `run_hook` gathers a [`Snapshot`] through a [`Runtime`], lets the relay
//! evaluate it, flushes the relation buckets the relay changed, and writes
//! the resulting unit status.

#[cfg(test)]
pub(crate) mod memory;
pub mod tools;

use std::future::Future;

use crate::config::CharmConfig;
use crate::event::HookEvent;
use crate::relation::{Databag, RelationHandle, RelationId};
use crate::relay::{EndpointRelay, Snapshot};
use crate::status::StatusReport;

/// What the proxy needs from the orchestration runtime.
pub trait Runtime {
    fn is_leader(&self) -> impl Future<Output = crate::Result<bool>>;

    fn charm_config(&self) -> impl Future<Output = crate::Result<CharmConfig>>;

    /// Joined relations of `integration`. The local bucket is only read
    /// when `leader` is set. `skip` names a relation being torn down; it is
    /// left out without touching its buckets.
    fn relations(
        &self,
        integration: &str,
        leader: bool,
        skip: Option<&RelationId>,
    ) -> impl Future<Output = crate::Result<Vec<RelationHandle>>>;

    /// Replace the local application bucket of a relation.
    fn relation_set(
        &self,
        id: &RelationId,
        data: &Databag,
    ) -> impl Future<Output = crate::Result<()>>;

    fn status_set(&self, report: &StatusReport) -> impl Future<Output = crate::Result<()>>;
}

/// Handle one hook end to end.
///
/// Returns the status written, or `None` if the hook does not evaluate.
/// Failures reading runtime state are returned so the runtime retries the
/// hook; relation write failures only affect the reported status.
pub async fn run_hook<R: Runtime>(
    runtime: &R,
    relay: &EndpointRelay,
    event: &HookEvent,
) -> crate::Result<Option<StatusReport>> {
    if !event.triggers_evaluation() {
        tracing::debug!(hook = %event, "hook ignored");
        return Ok(None);
    }

    let leader = runtime.is_leader().await?;
    let config = runtime.charm_config().await?;
    // A broken relation's data can no longer be read.
    let relations = runtime
        .relations(relay.integration(), leader, event.broken_relation())
        .await?;
    let mut snapshot = Snapshot {
        leader,
        config,
        relations,
    };

    let Some(report) = relay.handle(event, &mut snapshot) else {
        return Ok(None);
    };

    let report = flush(runtime, &mut snapshot.relations, report).await;
    runtime.status_set(&report).await?;
    Ok(Some(report))
}

/// Write dirty buckets back, each relation independently.
async fn flush<R: Runtime>(
    runtime: &R,
    relations: &mut [RelationHandle],
    report: StatusReport,
) -> StatusReport {
    let mut attempted = 0usize;
    let mut failed = 0usize;

    for relation in relations.iter_mut().filter(|r| r.is_dirty()) {
        attempted += 1;
        match runtime.relation_set(&relation.id, relation.local_data()).await {
            Ok(()) => relation.mark_flushed(),
            Err(e) => {
                failed += 1;
                tracing::warn!(relation = %relation.id, error = %e, "failed to publish endpoint");
            }
        }
    }

    settle(report, attempted, failed)
}

/// Fold relation write failures into the evaluated status.
fn settle(report: StatusReport, attempted: usize, failed: usize) -> StatusReport {
    if failed == 0 {
        report
    } else if failed == attempted {
        StatusReport::error(format!(
            "Failed to publish endpoint to {} integration(s)",
            failed
        ))
    } else {
        StatusReport::active(format!(
            "{} ({} of {} integration(s) failed)",
            report.message, failed, attempted
        ))
    }
}
