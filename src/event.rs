//! Lifecycle events delivered by the orchestration runtime.
//!
//! The runtime names the hook being run through its dispatch path
//! (`hooks/config-changed`, `hooks/nfs-share-relation-changed`, ...).

use std::fmt;

use crate::relation::RelationId;

const RELATION_SUFFIXES: [(&str, RelationEventKind); 5] = [
    ("-relation-created", RelationEventKind::Created),
    ("-relation-joined", RelationEventKind::Joined),
    ("-relation-changed", RelationEventKind::Changed),
    ("-relation-departed", RelationEventKind::Departed),
    ("-relation-broken", RelationEventKind::Broken),
];

/// Phase of a relation's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationEventKind {
    Created,
    Joined,
    Changed,
    Departed,
    Broken,
}

impl RelationEventKind {
    fn suffix(&self) -> &'static str {
        RELATION_SUFFIXES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(suffix, _)| *suffix)
            .unwrap_or_default()
    }
}

/// A hook the proxy was invoked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Install,
    Start,
    ConfigChanged,
    UpgradeCharm,
    LeaderElected,
    LeaderSettingsChanged,
    UpdateStatus,
    Stop,
    Remove,
    Relation {
        relation: String,
        kind: RelationEventKind,
        /// Relation instance the event concerns, when the runtime says.
        id: Option<RelationId>,
    },
    /// Any hook the proxy does not react to (storage, actions, ...).
    Other(String),
}

impl HookEvent {
    /// Parse a bare hook name such as `nfs-share-relation-joined`.
    pub fn from_hook_name(name: &str) -> Self {
        match name {
            "install" => HookEvent::Install,
            "start" => HookEvent::Start,
            "config-changed" => HookEvent::ConfigChanged,
            "upgrade-charm" => HookEvent::UpgradeCharm,
            "leader-elected" => HookEvent::LeaderElected,
            "leader-settings-changed" => HookEvent::LeaderSettingsChanged,
            "update-status" => HookEvent::UpdateStatus,
            "stop" => HookEvent::Stop,
            "remove" => HookEvent::Remove,
            _ => RELATION_SUFFIXES
                .iter()
                .find_map(|(suffix, kind)| {
                    name.strip_suffix(suffix)
                        .filter(|relation| !relation.is_empty())
                        .map(|relation| HookEvent::Relation {
                            relation: relation.to_string(),
                            kind: *kind,
                            id: None,
                        })
                })
                .unwrap_or_else(|| HookEvent::Other(name.to_string())),
        }
    }

    /// Parse a dispatch path (`hooks/<name>`); only the last component counts.
    pub fn from_dispatch_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        Self::from_hook_name(name)
    }

    /// Attach the relation instance to a relation event. No-op otherwise.
    pub fn with_relation_id(mut self, relation_id: Option<RelationId>) -> Self {
        if let HookEvent::Relation { id, .. } = &mut self {
            *id = relation_id;
        }
        self
    }

    /// The relation a `-relation-broken` hook is tearing down, if known.
    pub fn broken_relation(&self) -> Option<&RelationId> {
        match self {
            HookEvent::Relation {
                kind: RelationEventKind::Broken,
                id,
                ..
            } => id.as_ref(),
            _ => None,
        }
    }

    /// Whether handling this hook recomputes status and relation data.
    pub fn triggers_evaluation(&self) -> bool {
        !matches!(
            self,
            HookEvent::Stop | HookEvent::Remove | HookEvent::Other(_)
        )
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookEvent::Install => "install",
            HookEvent::Start => "start",
            HookEvent::ConfigChanged => "config-changed",
            HookEvent::UpgradeCharm => "upgrade-charm",
            HookEvent::LeaderElected => "leader-elected",
            HookEvent::LeaderSettingsChanged => "leader-settings-changed",
            HookEvent::UpdateStatus => "update-status",
            HookEvent::Stop => "stop",
            HookEvent::Remove => "remove",
            HookEvent::Relation { relation, kind, .. } => {
                return write!(f, "{}{}", relation, kind.suffix());
            }
            HookEvent::Other(name) => name.as_str(),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_hooks() {
        assert_eq!(HookEvent::from_hook_name("install"), HookEvent::Install);
        assert_eq!(
            HookEvent::from_hook_name("config-changed"),
            HookEvent::ConfigChanged
        );
        assert_eq!(
            HookEvent::from_hook_name("update-status"),
            HookEvent::UpdateStatus
        );
    }

    #[test]
    fn test_relation_hooks() {
        assert_eq!(
            HookEvent::from_hook_name("nfs-share-relation-changed"),
            HookEvent::Relation {
                relation: "nfs-share".to_string(),
                kind: RelationEventKind::Changed,
                id: None,
            }
        );
        assert!(matches!(
            HookEvent::from_hook_name("juju-info-relation-broken"),
            HookEvent::Relation { relation, kind: RelationEventKind::Broken, .. } if relation == "juju-info"
        ));
    }

    #[test]
    fn test_unknown_hooks() {
        assert_eq!(
            HookEvent::from_hook_name("data-storage-attached"),
            HookEvent::Other("data-storage-attached".to_string())
        );
        assert_eq!(
            HookEvent::from_hook_name("-relation-joined"),
            HookEvent::Other("-relation-joined".to_string())
        );
    }

    #[test]
    fn test_dispatch_path() {
        assert_eq!(
            HookEvent::from_dispatch_path("hooks/config-changed"),
            HookEvent::ConfigChanged
        );
        assert_eq!(HookEvent::from_dispatch_path("install"), HookEvent::Install);
    }

    #[test]
    fn test_with_relation_id() {
        let id = RelationId::new("nfs-share", 7);
        let event = HookEvent::from_hook_name("nfs-share-relation-departed")
            .with_relation_id(Some(id.clone()));
        assert!(matches!(event, HookEvent::Relation { id: Some(ref got), .. } if *got == id));

        let event = HookEvent::ConfigChanged.with_relation_id(Some(id));
        assert_eq!(event, HookEvent::ConfigChanged);
    }

    #[test]
    fn test_display_round_trips_hook_name() {
        for name in ["leader-elected", "nfs-share-relation-joined", "collect-metrics"] {
            assert_eq!(HookEvent::from_hook_name(name).to_string(), name);
        }
    }

    #[test]
    fn test_broken_relation() {
        let id = RelationId::new("nfs-share", 2);
        let broken = HookEvent::from_hook_name("nfs-share-relation-broken")
            .with_relation_id(Some(id.clone()));
        assert_eq!(broken.broken_relation(), Some(&id));

        let departed = HookEvent::from_hook_name("nfs-share-relation-departed")
            .with_relation_id(Some(id));
        assert_eq!(departed.broken_relation(), None);
        assert_eq!(HookEvent::ConfigChanged.broken_relation(), None);
    }

    #[test]
    fn test_triggers_evaluation() {
        assert!(HookEvent::ConfigChanged.triggers_evaluation());
        assert!(HookEvent::from_hook_name("nfs-share-relation-broken").triggers_evaluation());
        assert!(!HookEvent::Stop.triggers_evaluation());
        assert!(!HookEvent::Other("collect-metrics".to_string()).triggers_evaluation());
    }
}
