//! Diff computation between two synthesized templates

use crate::template::{Template, TemplateResource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How a single resource changes between two templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Only present in the new template
    Added,
    /// Only present in the old template
    Removed,
    /// Same type, different settings
    Modified {
        /// Top-level property names whose values differ
        properties: Vec<String>,
        /// DependsOn or deletion policies differ
        metadata: bool,
    },
    /// Same logical id, different type: the engine replaces it
    TypeChanged { from: String, to: String },
}

/// A diff for one logical id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Logical id of the resource
    pub logical_id: String,
    /// Type of the resource in the new template (old one when removed)
    pub resource_type: String,
    /// What changed
    pub change: ChangeKind,
}

impl ResourceDiff {
    /// Compare two entries for the same logical id
    fn between(logical_id: &str, old: &TemplateResource, new: &TemplateResource) -> Option<Self> {
        if old.resource_type != new.resource_type {
            return Some(Self {
                logical_id: logical_id.to_string(),
                resource_type: new.resource_type.clone(),
                change: ChangeKind::TypeChanged {
                    from: old.resource_type.clone(),
                    to: new.resource_type.clone(),
                },
            });
        }

        let keys: BTreeSet<&String> = old.properties.keys().chain(new.properties.keys()).collect();
        let properties: Vec<String> = keys
            .into_iter()
            .filter(|k| old.properties.get(*k) != new.properties.get(*k))
            .cloned()
            .collect();

        let metadata = old.depends_on != new.depends_on
            || old.deletion_policy != new.deletion_policy
            || old.update_replace_policy != new.update_replace_policy;

        if properties.is_empty() && !metadata {
            return None;
        }

        Some(Self {
            logical_id: logical_id.to_string(),
            resource_type: new.resource_type.clone(),
            change: ChangeKind::Modified {
                properties,
                metadata,
            },
        })
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(self.change, ChangeKind::Added)
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(self.change, ChangeKind::Removed)
    }

    /// Check if this diff represents a modification (including type changes)
    pub fn is_modification(&self) -> bool {
        matches!(
            self.change,
            ChangeKind::Modified { .. } | ChangeKind::TypeChanged { .. }
        )
    }
}

/// Compute per-resource diffs from `old` to `new`
///
/// Results are sorted by logical id. Unchanged resources are omitted.
pub fn compute_diffs(old: &Template, new: &Template) -> Vec<ResourceDiff> {
    let ids: BTreeSet<&String> = old.resources.keys().chain(new.resources.keys()).collect();

    ids.into_iter()
        .filter_map(|id| match (old.resources.get(id), new.resources.get(id)) {
            (None, Some(added)) => Some(ResourceDiff {
                logical_id: id.clone(),
                resource_type: added.resource_type.clone(),
                change: ChangeKind::Added,
            }),
            (Some(removed), None) => Some(ResourceDiff {
                logical_id: id.clone(),
                resource_type: removed.resource_type.clone(),
                change: ChangeKind::Removed,
            }),
            (Some(before), Some(after)) => ResourceDiff::between(id, before, after),
            (None, None) => None,
        })
        .collect()
}

/// Names of outputs that were added, removed, or changed
pub fn changed_outputs(old: &Template, new: &Template) -> Vec<String> {
    let names: BTreeSet<&String> = old.outputs.keys().chain(new.outputs.keys()).collect();
    names
        .into_iter()
        .filter(|name| old.outputs.get(*name) != new.outputs.get(*name))
        .cloned()
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of resources whose type changed
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.change {
                ChangeKind::Added => summary.additions += 1,
                ChangeKind::Removed => summary.removals += 1,
                ChangeKind::Modified { .. } => summary.modifications += 1,
                ChangeKind::TypeChanged { .. } => summary.replacements += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> HashMap<String, Vec<&ResourceDiff>> {
    let mut groups: HashMap<String, Vec<&ResourceDiff>> = HashMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
