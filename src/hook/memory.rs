//! In-memory runtime for exercising `run_hook` without hook tools.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::config::CharmConfig;
use crate::error::ProxyError;
use crate::hook::Runtime;
use crate::relation::{Databag, RelationHandle, RelationId};
use crate::status::StatusReport;

#[derive(Default)]
struct State {
    leader: bool,
    config: CharmConfig,
    fail_config_get: bool,
    /// relation id -> (remote app, local bucket, remote bucket)
    relations: BTreeMap<RelationId, (String, Databag, Databag)>,
    fail_writes: HashSet<RelationId>,
    fail_reads: HashSet<RelationId>,
    writes: usize,
    statuses: Vec<StatusReport>,
}

pub(crate) struct MemoryRuntime {
    state: Mutex<State>,
}

impl MemoryRuntime {
    pub(crate) fn new(leader: bool, endpoint: Option<&str>) -> Self {
        let state = State {
            leader,
            config: CharmConfig {
                endpoint: endpoint.map(String::from),
            },
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub(crate) fn add_relation(&self, id: u32, remote_app: &str) -> RelationId {
        let id = RelationId::new("nfs-share", id);
        self.state.lock().unwrap().relations.insert(
            id.clone(),
            (remote_app.to_string(), Databag::new(), Databag::new()),
        );
        id
    }

    pub(crate) fn fail_writes_to(&self, id: &RelationId) {
        self.state.lock().unwrap().fail_writes.insert(id.clone());
    }

    /// Reading this relation's buckets fails, as it does once it is broken.
    pub(crate) fn fail_reads_from(&self, id: &RelationId) {
        self.state.lock().unwrap().fail_reads.insert(id.clone());
    }

    pub(crate) fn fail_config_get(&self) {
        self.state.lock().unwrap().fail_config_get = true;
    }

    pub(crate) fn local_data(&self, id: &RelationId) -> Databag {
        self.state.lock().unwrap().relations[id].1.clone()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub(crate) fn statuses(&self) -> Vec<StatusReport> {
        self.state.lock().unwrap().statuses.clone()
    }
}

impl Runtime for MemoryRuntime {
    async fn is_leader(&self) -> crate::Result<bool> {
        Ok(self.state.lock().unwrap().leader)
    }

    async fn charm_config(&self) -> crate::Result<CharmConfig> {
        let state = self.state.lock().unwrap();
        if state.fail_config_get {
            return Err(ProxyError::HookTool(
                "config-get".to_string(),
                "exit status 1".to_string(),
            ));
        }
        Ok(state.config.clone())
    }

    async fn relations(
        &self,
        integration: &str,
        leader: bool,
        skip: Option<&RelationId>,
    ) -> crate::Result<Vec<RelationHandle>> {
        let state = self.state.lock().unwrap();
        state
            .relations
            .iter()
            .filter(|(id, _)| id.name() == integration && Some(*id) != skip)
            .map(|(id, (app, local, remote))| {
                if state.fail_reads.contains(id) {
                    return Err(ProxyError::HookTool(
                        "relation-get".to_string(),
                        "permission denied".to_string(),
                    ));
                }
                let local = if leader { local.clone() } else { Databag::new() };
                Ok(RelationHandle::new(
                    id.clone(),
                    Some(app.clone()),
                    local,
                    remote.clone(),
                ))
            })
            .collect()
    }

    async fn relation_set(&self, id: &RelationId, data: &Databag) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes.contains(id) {
            return Err(ProxyError::RelationWrite(
                id.clone(),
                "permission denied".to_string(),
            ));
        }
        let (_, local, _) = state
            .relations
            .get_mut(id)
            .ok_or_else(|| ProxyError::RelationWrite(id.clone(), "no such relation".to_string()))?;
        local.clone_from(data);
        state.writes += 1;
        Ok(())
    }

    async fn status_set(&self, report: &StatusReport) -> crate::Result<()> {
        self.state.lock().unwrap().statuses.push(report.clone());
        Ok(())
    }
}
