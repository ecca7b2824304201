use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::range::{PortRange, Protocol};

/// An ordered mapping from port ranges to SELinux types.
///
/// Maps produced by [`crate::reconcile`], [`crate::overlay`] and [`crate::coalesce`] never hold
/// two overlapping ranges of the same protocol. Raw listings, such as a parsed default
/// policy, may nest ranges inside one another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyMap {
    entries: BTreeMap<PortRange, String>,
}

impl PolicyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Type assigned to exactly this range, if any.
    pub fn get(&self, range: &PortRange) -> Option<&str> {
        self.entries.get(range).map(String::as_str)
    }

    pub fn contains(&self, range: &PortRange) -> bool {
        self.entries.contains_key(range)
    }

    /// Insert an entry, returning the type previously stored for the exact range.
    pub fn insert(&mut self, range: PortRange, label: impl Into<String>) -> Option<String> {
        self.entries.insert(range, label.into())
    }

    pub fn remove(&mut self, range: &PortRange) -> Option<String> {
        self.entries.remove(range)
    }

    /// Entries in canonical range order.
    pub fn iter(&self) -> impl Iterator<Item = (&PortRange, &str)> + '_ {
        self.entries
            .iter()
            .map(|(range, label)| (range, label.as_str()))
    }

    pub fn ranges(&self) -> impl Iterator<Item = &PortRange> + '_ {
        self.entries.keys()
    }

    /// Entries of one protocol in canonical range order.
    pub fn iter_protocol(
        &self,
        protocol: Protocol,
    ) -> impl Iterator<Item = (&PortRange, &str)> + '_ {
        self.iter()
            .filter(move |(range, _)| range.protocol() == protocol)
    }

    /// Entries that share at least one port with `range`.
    ///
    /// The scan stops at the first entry starting past `range`.
    pub fn overlapping<'a>(
        &'a self,
        range: &'a PortRange,
    ) -> impl Iterator<Item = (&'a PortRange, &'a str)> + 'a {
        self.iter()
            .take_while(move |(existing, _)| existing.from() <= range.to())
            .filter(move |(existing, _)| existing.overlaps(range))
    }

    /// Type covering a single port, if the map has a range containing it.
    pub fn label_for_port(&self, protocol: Protocol, port: u16) -> Option<&str> {
        self.iter_protocol(protocol)
            .take_while(|(range, _)| range.from() <= port)
            .find(|(range, _)| range.contains_port(port))
            .map(|(_, label)| label)
    }
}

impl FromIterator<(PortRange, String)> for PolicyMap {
    fn from_iter<T: IntoIterator<Item = (PortRange, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(PortRange, &'a str)> for PolicyMap {
    fn from_iter<T: IntoIterator<Item = (PortRange, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(range, label)| (range, label.to_string()))
            .collect()
    }
}

impl IntoIterator for PolicyMap {
    type Item = (PortRange, String);
    type IntoIter = btree_map::IntoIter<PortRange, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Serialize)]
struct EntryRow<'a> {
    from: u16,
    to: u16,
    protocol: Protocol,
    label: &'a str,
}

impl Serialize for PolicyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(range, label)| EntryRow {
            from: range.from(),
            to: range.to(),
            protocol: range.protocol(),
            label,
        }))
    }
}

/// Every range involved in a same-protocol overlap with another range of the input.
pub fn find_overlaps<'a, I>(ranges: I) -> BTreeSet<PortRange>
where
    I: IntoIterator<Item = &'a PortRange>,
{
    let ranges: Vec<&PortRange> = ranges.into_iter().collect();
    let mut overlaps = BTreeSet::new();
    for (idx, first) in ranges.iter().enumerate() {
        for second in &ranges[..idx] {
            if first.overlaps(second) {
                overlaps.insert(**first);
                overlaps.insert(**second);
            }
        }
    }
    overlaps
}

/// In debug builds, panic with a dump of the map when any two same-protocol entries
/// overlap. Does nothing in release builds.
///
/// Overlap in an engine-produced policy is a defect, never an input error. Listings
/// read from `semanage` are not checked with this.
pub fn assert_no_overlaps(policy: &PolicyMap) {
    if !cfg!(debug_assertions) {
        return;
    }
    let overlaps = find_overlaps(policy.ranges());
    if !overlaps.is_empty() {
        tracing::debug!(
            "{}",
            dump_policy(&format!("Policy with overlapping ports: {overlaps:?}"), policy)
        );
        panic!("port ranges overlap: {overlaps:?}");
    }
}

/// Ranges in `policy` carrying `label`.
pub fn filter_by_label(policy: &PolicyMap, label: &str) -> BTreeSet<PortRange> {
    policy
        .iter()
        .filter(|(_, existing)| *existing == label)
        .map(|(range, _)| *range)
        .collect()
}

/// Line-by-line `range=label` dump headed by `title`.
pub fn dump_policy(title: &str, policy: &PolicyMap) -> String {
    let mut lines = Vec::with_capacity(policy.len() + 1);
    lines.push(title.to_string());
    lines.extend(policy.iter().map(|(range, label)| format!("{range}={label}")));
    lines.join("\n")
}
