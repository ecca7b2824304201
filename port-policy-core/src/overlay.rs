use crate::policy::PolicyMap;
use crate::range::PortRange;

/// Lay `range -> label` over a copy of `policy`.
///
/// Every same-protocol entry intersecting `range` is removed and the parts of it
/// below and above `range` are put back under their original type. Entries outside
/// `range` are untouched and the new entry is not coalesced with its neighbours.
pub fn overlay(policy: &PolicyMap, range: PortRange, label: &str) -> PolicyMap {
    let mut result = policy.clone();
    overlay_in_place(&mut result, range, label);
    result
}

pub(crate) fn overlay_in_place(policy: &mut PolicyMap, range: PortRange, label: &str) {
    let hits: Vec<(PortRange, String)> = policy
        .overlapping(&range)
        .map(|(existing, existing_label)| (*existing, existing_label.to_string()))
        .collect();

    let mut remainders = Vec::with_capacity(hits.len() * 2);
    for (existing, existing_label) in hits {
        policy.remove(&existing);
        if let Some(lower) = existing.split_below(range.from()) {
            remainders.push((lower, existing_label.clone()));
        }
        if let Some(upper) = existing.split_above(range.to()) {
            remainders.push((upper, existing_label));
        }
    }

    for (remainder, remainder_label) in remainders {
        if policy.insert(remainder, remainder_label).is_some() {
            unreachable!("split remainder {remainder} collided with a surviving entry");
        }
    }
    if policy.insert(range, label).is_some() {
        unreachable!("overlaid range {range} collided with a surviving entry");
    }
}
