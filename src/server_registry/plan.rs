//! Reconcile planning
//!
//! Pure diff between the remote server set and the persisted registry.
//! The whole change set is computed before anything touches the store.

use super::types::{
    keys, ordinal_key, sort_by_ordinal, LocalRegistry, ReconcileReport, Removal, RemovalReason,
    Rename, ServerRecord,
};
use crate::config_store::StoreOp;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Staged mutations for one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub removals: Vec<Removal>,
    pub renames: Vec<Rename>,
    pub insertions: Vec<ServerRecord>,
    /// Registry as it will look once the plan is applied
    pub result: Vec<ServerRecord>,
}

impl ReconcilePlan {
    /// Diff `remote` (remote id -> display name) against `local`
    pub fn build(remote: &BTreeMap<String, String>, local: LocalRegistry) -> Self {
        let mut plan = Self::default();

        for local_key in local.malformed {
            plan.removals.push(Removal {
                local_key,
                remote_id: None,
                reason: RemovalReason::Malformed,
            });
        }

        let mut records = local.records;
        sort_by_ordinal(&mut records);

        // Deletions and renames; lowest ordinal wins a duplicated id
        let mut known: HashSet<String> = HashSet::new();
        for mut record in records {
            if known.contains(&record.remote_id) {
                plan.removals.push(Removal {
                    local_key: record.local_key,
                    remote_id: Some(record.remote_id),
                    reason: RemovalReason::Duplicate,
                });
                continue;
            }
            known.insert(record.remote_id.clone());

            let Some(remote_name) = remote.get(&record.remote_id) else {
                plan.removals.push(Removal {
                    local_key: record.local_key,
                    remote_id: Some(record.remote_id),
                    reason: RemovalReason::Gone,
                });
                continue;
            };

            if &record.name != remote_name {
                plan.renames.push(Rename {
                    local_key: record.local_key.clone(),
                    remote_id: record.remote_id.clone(),
                    from: std::mem::replace(&mut record.name, remote_name.clone()),
                    to: remote_name.clone(),
                });
            }
            plan.result.push(record);
        }

        // Insertions take the lowest free ordinal among surviving keys
        let mut used: BTreeSet<u32> = plan.result.iter().filter_map(ServerRecord::ordinal).collect();
        for (remote_id, name) in remote {
            if known.contains(remote_id) {
                continue;
            }
            let ordinal = lowest_free_ordinal(&used);
            used.insert(ordinal);

            let record = ServerRecord::new(ordinal_key(ordinal), remote_id.as_str(), name.as_str());
            plan.insertions.push(record.clone());
            plan.result.push(record);
        }

        sort_by_ordinal(&mut plan.result);
        plan
    }

    pub fn is_noop(&self) -> bool {
        self.removals.is_empty() && self.renames.is_empty() && self.insertions.is_empty()
    }

    /// Store mutations in pass order: deletions, updates, insertions
    pub fn ops(&self) -> Vec<StoreOp> {
        let mut ops = Vec::new();
        for removal in &self.removals {
            ops.push(StoreOp::delete_section(&removal.local_key));
        }
        for rename in &self.renames {
            ops.push(StoreOp::set(&rename.local_key, keys::NAME, rename.to.as_str()));
        }
        for record in &self.insertions {
            ops.extend(record.create_ops());
        }
        ops
    }

    pub fn into_report(self) -> ReconcileReport {
        ReconcileReport {
            servers: self.result.iter().map(ServerRecord::summary).collect(),
            created: self.insertions.iter().map(ServerRecord::summary).collect(),
            renamed: self.renames,
            removed: self.removals,
        }
    }
}

fn lowest_free_ordinal(used: &BTreeSet<u32>) -> u32 {
    (1..).find(|n| !used.contains(n)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }

    fn record(key: &str, id: &str, name: &str, hidden: bool) -> ServerRecord {
        ServerRecord {
            local_key: key.to_string(),
            remote_id: id.to_string(),
            name: name.to_string(),
            hidden,
        }
    }

    fn local(records: Vec<ServerRecord>) -> LocalRegistry {
        LocalRegistry {
            records,
            malformed: vec![],
        }
    }

    #[test]
    fn test_empty_registry_inserts_in_id_order() {
        let plan = ReconcilePlan::build(&remote(&[("B", "Beta"), ("A", "Alpha")]), LocalRegistry::default());

        assert_eq!(
            plan.result,
            vec![
                record("server_1", "A", "Alpha", false),
                record("server_2", "B", "Beta", false),
            ]
        );
        assert!(plan.removals.is_empty());
    }

    #[test]
    fn test_rename_keeps_key_and_hidden() {
        let plan = ReconcilePlan::build(
            &remote(&[("A", "Alpha-Renamed")]),
            local(vec![record("server_1", "A", "Alpha", true)]),
        );

        assert_eq!(plan.result, vec![record("server_1", "A", "Alpha-Renamed", true)]);
        assert_eq!(plan.renames[0].from, "Alpha");
        assert_eq!(
            plan.ops(),
            vec![StoreOp::set("server_1", "name", "Alpha-Renamed")]
        );
    }

    #[test]
    fn test_insertion_reuses_lowest_gap() {
        let plan = ReconcilePlan::build(
            &remote(&[("A", "Alpha"), ("C", "Gamma"), ("D", "Delta")]),
            local(vec![
                record("server_1", "A", "Alpha", false),
                record("server_3", "C", "Gamma", false),
            ]),
        );

        assert_eq!(plan.insertions, vec![record("server_2", "D", "Delta", false)]);
    }

    #[test]
    fn test_key_freed_by_deletion_is_reused_after_delete() {
        let plan = ReconcilePlan::build(
            &remote(&[("B", "Beta")]),
            local(vec![record("server_1", "A", "Alpha", false)]),
        );

        assert_eq!(
            plan.ops(),
            vec![
                StoreOp::delete_section("server_1"),
                StoreOp::set("server_1", "id", "B"),
                StoreOp::set("server_1", "name", "Beta"),
                StoreOp::set("server_1", "hide", false),
            ]
        );
    }

    #[test]
    fn test_duplicates_and_malformed_are_removed() {
        let plan = ReconcilePlan::build(
            &remote(&[("A", "Alpha")]),
            LocalRegistry {
                records: vec![
                    record("server_4", "A", "Alpha", false),
                    record("server_2", "A", "Alpha", true),
                ],
                malformed: vec!["server_9".to_string()],
            },
        );

        assert_eq!(plan.result, vec![record("server_2", "A", "Alpha", true)]);
        let reasons: Vec<_> = plan.removals.iter().map(|r| (r.local_key.as_str(), r.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                ("server_9", RemovalReason::Malformed),
                ("server_4", RemovalReason::Duplicate),
            ]
        );
    }

    #[test]
    fn test_unchanged_is_noop() {
        let plan = ReconcilePlan::build(
            &remote(&[("A", "Alpha")]),
            local(vec![record("server_1", "A", "Alpha", false)]),
        );
        assert!(plan.is_noop());
        assert!(plan.ops().is_empty());
    }

    #[test]
    fn test_non_canonical_key_is_kept_and_not_counted() {
        let plan = ReconcilePlan::build(
            &remote(&[("A", "Alpha"), ("B", "Beta")]),
            local(vec![record("server_main", "A", "Alpha", false)]),
        );
        assert_eq!(plan.insertions[0].local_key, "server_1");
        assert_eq!(plan.result.last().unwrap().local_key, "server_main");
    }
}
