use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One sound zone as seen by a discovery run. Rebuilt in full every run;
/// never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub zone_id: String,
    pub account_id: String,
    pub is_paired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl ZoneDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Pure set difference between two discovery runs:
/// `added = current - previous`, `removed = previous - current`.
pub fn diff(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> ZoneDiff {
    ZoneDiff {
        added: current.difference(previous).cloned().collect(),
        removed: previous.difference(current).cloned().collect(),
    }
}
