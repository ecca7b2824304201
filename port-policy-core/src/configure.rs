use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use crate::coalesce::coalesce_ranges;
use crate::policy::{filter_by_label, find_overlaps, PolicyMap};
use crate::range::PortRange;

/// Kind of change issued against the local policy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// New local entry for a range no default entry occupies exactly.
    Add,
    /// Reassign a range that exactly matches a default entry of another type.
    Modify,
    /// Remove a local entry.
    Delete,
}

/// One `semanage port` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortOperation {
    pub kind: OperationKind,
    pub range: PortRange,
    pub label: String,
}

impl PortOperation {
    fn new(kind: OperationKind, range: PortRange, label: &str) -> Self {
        Self {
            kind,
            range,
            label: label.to_string(),
        }
    }
}

impl Display for PortOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            OperationKind::Add => "Adding",
            OperationKind::Modify => "Modifying",
            OperationKind::Delete => "Deleting",
        };
        write!(f, "{verb} SELinux port: {}={}", self.range, self.label)
    }
}

/// Why a desired labeling was refused. Nothing is changed in either case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigureError {
    /// The requested ranges overlap each other.
    #[error("port ranges overlap: {}", join_ranges(.ranges))]
    Overlap { ranges: Vec<PortRange> },
    /// Other types already hold some of the requested ports in local policy.
    #[error(
        "port ranges of type {label} conflict with other local policy: {}",
        join_conflicts(.conflicts)
    )]
    Conflict {
        label: String,
        conflicts: Vec<(PortRange, String)>,
    },
}

fn join_ranges(ranges: &[PortRange]) -> String {
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_conflicts(conflicts: &[(PortRange, String)]) -> String {
    conflicts
        .iter()
        .map(|(range, label)| format!("{range}={label}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reject desired sets whose ranges overlap one another.
pub fn validate_desired(desired: &BTreeSet<PortRange>) -> Result<(), ConfigureError> {
    let overlaps = find_overlaps(desired);
    if overlaps.is_empty() {
        Ok(())
    } else {
        Err(ConfigureError::Overlap {
            ranges: overlaps.into_iter().collect(),
        })
    }
}

/// Local entries of a type other than `label` that share ports with `desired`.
pub fn find_conflicts(
    desired: &BTreeSet<PortRange>,
    label: &str,
    local: &PolicyMap,
) -> PolicyMap {
    let mut conflicts = PolicyMap::new();
    for range in desired {
        for (existing, existing_label) in local.overlapping(range) {
            if existing_label != label {
                conflicts.insert(*existing, existing_label);
            }
        }
    }
    conflicts
}

/// Fail with every conflicting `(range, type)` pair when `desired` collides with
/// another type's local policy.
pub fn check_conflicts(
    desired: &BTreeSet<PortRange>,
    label: &str,
    local: &PolicyMap,
) -> Result<(), ConfigureError> {
    let conflicts = find_conflicts(desired, label, local);
    if conflicts.is_empty() {
        return Ok(());
    }
    Err(ConfigureError::Conflict {
        label: label.to_string(),
        conflicts: conflicts.into_iter().collect(),
    })
}

/// Ordered operations that bring the local entries of `label` to `coalesced`.
///
/// `coalesced` must already be validated, conflict-checked and coalesced. Operations
/// are meant to be issued in order: deletions that clear room for a range come
/// directly before it is added or modified.
pub fn plan_operations(
    coalesced: &BTreeSet<PortRange>,
    label: &str,
    local: &PolicyMap,
    default: &PolicyMap,
) -> Vec<PortOperation> {
    let mut existing = filter_by_label(local, label);
    let mut operations = Vec::new();

    for range in coalesced {
        let default_label = default.get(range);
        if default_label == Some(label) {
            tracing::debug!(%range, label, "already provided by default policy");
            continue;
        }
        if existing.contains(range) {
            continue;
        }

        let in_the_way: Vec<PortRange> = existing
            .iter()
            .filter(|other| !coalesced.contains(*other) && other.overlaps(range))
            .copied()
            .collect();
        for other in in_the_way {
            existing.remove(&other);
            operations.push(PortOperation::new(OperationKind::Delete, other, label));
        }

        let kind = if default_label.is_some() {
            OperationKind::Modify
        } else {
            OperationKind::Add
        };
        operations.push(PortOperation::new(kind, *range, label));
    }

    for other in existing {
        if !coalesced.contains(&other) {
            operations.push(PortOperation::new(OperationKind::Delete, other, label));
        }
    }
    operations
}

/// Full pure pipeline: validate, conflict-check, coalesce and plan.
pub fn plan_configure(
    desired: &BTreeSet<PortRange>,
    label: &str,
    local: &PolicyMap,
    default: &PolicyMap,
) -> Result<Vec<PortOperation>, ConfigureError> {
    validate_desired(desired)?;
    check_conflicts(desired, label, local)?;
    let coalesced = coalesce_ranges(desired);
    Ok(plan_operations(&coalesced, label, local, default))
}
