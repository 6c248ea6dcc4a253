use std::collections::BTreeSet;

use chrono::TimeZone;

use crate::{normalize_mtime, LocalEntries, RemoteEntries};

/// The operations of one sync cycle.
///
/// The three sets are disjoint: a name is either only local (upload),
/// on both sides with a newer local file (overwrite), or only remote (delete).
/// Files on both sides whose remote copy is as recent or more recent
/// produce no operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_upload: BTreeSet<String>,
    pub to_overwrite: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,
}

impl SyncPlan {
    /// Compare both listings.
    ///
    /// Remote timestamps are converted to `tz` and stripped of their zone
    /// before being compared with the local naive modification times.
    /// Equal timestamps are left alone.
    pub fn build<Tz: TimeZone>(local: &LocalEntries, remote: &RemoteEntries, tz: &Tz) -> Self {
        let mut plan = SyncPlan::default();

        for (name, local_mtime) in local.iter() {
            match remote.get(name) {
                None => {
                    plan.to_upload.insert(name.clone());
                }
                Some(remote_mtime) => {
                    if *local_mtime > normalize_mtime(remote_mtime, tz) {
                        plan.to_overwrite.insert(name.clone());
                    }
                }
            }
        }

        plan.to_delete = remote
            .keys()
            .filter(|name| !local.contains_key(*name))
            .cloned()
            .collect();

        plan
    }

    pub fn len(&self) -> usize {
        self.to_upload.len() + self.to_overwrite.len() + self.to_delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
