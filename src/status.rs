//! Unit status reporting.
//!
//! An evaluation records one labelled status per concern in a [`StatusPool`];
//! the highest-priority entry becomes the unit status.

use std::collections::BTreeMap;
use std::fmt;

/// Status labels a unit can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// Endpoint valid and published
    Active,
    /// Operator action required: bad config or no integration
    Blocked,
    /// Publishing failed on every integration
    Error,
    /// Nothing configured yet
    Waiting,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Active => "active",
            UnitStatus::Blocked => "blocked",
            UnitStatus::Error => "error",
            UnitStatus::Waiting => "waiting",
        }
    }

    /// Global priority; higher wins when resolving a pool.
    fn priority(&self) -> u8 {
        match self {
            UnitStatus::Error => 4,
            UnitStatus::Blocked => 3,
            UnitStatus::Waiting => 2,
            UnitStatus::Active => 1,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status label with its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: UnitStatus,
    pub message: String,
}

impl StatusReport {
    pub fn new(status: UnitStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn active(message: impl Into<String>) -> Self {
        Self::new(UnitStatus::Active, message)
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(UnitStatus::Blocked, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(UnitStatus::Error, message)
    }

    pub fn waiting(message: impl Into<String>) -> Self {
        Self::new(UnitStatus::Waiting, message)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{}: {}", self.status, self.message)
        }
    }
}

/// Labelled statuses collected during one evaluation.
///
/// Adding a status under an existing label replaces it. Ties between
/// statuses of equal priority go to the one added first.
#[derive(Debug, Default)]
pub struct StatusPool {
    entries: BTreeMap<String, (usize, StatusReport)>,
    next_seq: usize,
}

impl StatusPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, report: StatusReport) {
        let seq = match self.entries.get(label) {
            Some((seq, _)) => *seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.entries.insert(label.to_string(), (seq, report));
    }

    pub fn get(&self, label: &str) -> Option<&StatusReport> {
        self.entries.get(label).map(|(_, report)| report)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the pool into the unit status.
    pub fn resolve(&self) -> StatusReport {
        self.entries
            .values()
            .max_by(|(seq_a, a), (seq_b, b)| {
                a.status
                    .priority()
                    .cmp(&b.status.priority())
                    .then(seq_b.cmp(seq_a))
            })
            .map(|(_, report)| report.clone())
            .unwrap_or_else(|| StatusReport::waiting("No status set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_is_waiting() {
        let pool = StatusPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.resolve(), StatusReport::waiting("No status set"));
    }

    #[test]
    fn test_highest_priority_wins() {
        let mut pool = StatusPool::new();
        pool.add("endpoint", StatusReport::active("ok"));
        pool.add("integration", StatusReport::blocked("no clients"));
        pool.add("other", StatusReport::waiting("later"));
        assert_eq!(pool.resolve(), StatusReport::blocked("no clients"));

        pool.add("publish", StatusReport::error("write failed"));
        assert_eq!(pool.resolve().status, UnitStatus::Error);
    }

    #[test]
    fn test_tie_goes_to_first_added() {
        let mut pool = StatusPool::new();
        pool.add("endpoint", StatusReport::blocked("bad endpoint"));
        pool.add("integration", StatusReport::blocked("no clients"));
        assert_eq!(pool.resolve().message, "bad endpoint");
    }

    #[test]
    fn test_replacing_label_keeps_position() {
        let mut pool = StatusPool::new();
        pool.add("endpoint", StatusReport::blocked("first"));
        pool.add("integration", StatusReport::blocked("no clients"));
        pool.add("endpoint", StatusReport::blocked("second"));
        assert_eq!(pool.resolve().message, "second");
        assert_eq!(pool.get("endpoint").unwrap().message, "second");
    }

    #[test]
    fn test_report_display() {
        assert_eq!(
            StatusReport::active("Sharing export at 10.0.0.5:/data").to_string(),
            "active: Sharing export at 10.0.0.5:/data"
        );
        assert_eq!(StatusReport::active("").to_string(), "active");
    }
}
