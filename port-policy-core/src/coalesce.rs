use std::collections::BTreeSet;

use crate::policy::{assert_no_overlaps, find_overlaps, PolicyMap};
use crate::range::{PortRange, Protocol};

/// Merge adjacent same-type entries of each protocol into single entries.
///
/// Inputs are sorted and non-overlapping, so one forward pass per protocol is enough:
/// once an entry has been extended, only the next entry can ever join it.
///
/// `80-81, 82` with one type becomes `80-82`; `65, 80, 81-82, 84, 85-90` becomes
/// `65, 80-82, 84-90`.
pub fn coalesce(policy: &PolicyMap) -> PolicyMap {
    assert_no_overlaps(policy);
    let mut result = PolicyMap::new();

    for protocol in Protocol::ALL {
        let mut last: Option<(PortRange, &str)> = None;
        for (range, label) in policy.iter_protocol(protocol) {
            let current = match last {
                Some((prev, prev_label)) if prev.is_followed_by(range) && prev_label == label => {
                    result.remove(&prev);
                    prev.extend_to(range)
                }
                _ => *range,
            };
            result.insert(current, label);
            last = Some((current, label));
        }
    }

    assert_no_overlaps(&result);
    result
}

/// Merge adjacent ranges of a label-less set, per protocol.
pub fn coalesce_ranges(ranges: &BTreeSet<PortRange>) -> BTreeSet<PortRange> {
    let overlaps = find_overlaps(ranges);
    assert!(overlaps.is_empty(), "port ranges overlap: {overlaps:?}");

    let mut result = BTreeSet::new();
    for protocol in Protocol::ALL {
        let mut last: Option<PortRange> = None;
        for range in ranges.iter().filter(|range| range.protocol() == protocol) {
            let current = match last {
                Some(prev) if prev.is_followed_by(range) => {
                    result.remove(&prev);
                    prev.extend_to(range)
                }
                _ => *range,
            };
            result.insert(current);
            last = Some(current);
        }
    }
    result
}
