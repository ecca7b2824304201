use crate::coalesce::coalesce;
use crate::overlay::overlay_in_place;
use crate::policy::{assert_no_overlaps, dump_policy, PolicyMap};
use crate::range::{span_descending, PortRange, Protocol, MAX_PORT, MIN_PORT};

/// Baseline bands, per `sepolicy network -p ...`, applied to every protocol.
static EXTENSION_BANDS: [(u16, u16, &str); 5] = [
    (1, 511, "reserved_port_t"),
    (512, 1023, "hi_reserved_port_t"),
    (1024, 32767, "unreserved_port_t"),
    (32768, 61000, "ephemeral_port_t"),
    (61001, 65535, "unreserved_port_t"),
];

/// Built-in policy covering every port of every protocol.
///
/// Only fills gaps left by the live default policy; it never overrides an entry with
/// the same exact range.
pub fn default_policy_extensions() -> PolicyMap {
    let extensions: PolicyMap = Protocol::ALL
        .into_iter()
        .flat_map(|protocol| {
            EXTENSION_BANDS.iter().map(move |&(from, to, label)| {
                (
                    PortRange::new(from, to, protocol).unwrap_or_else(|err| {
                        unreachable!("extension band {from}-{to} is invalid: {err}")
                    }),
                    label,
                )
            })
        })
        .collect();
    assert_no_overlaps(&extensions);
    extensions
}

/// Build the effective policy from local and default policy.
///
/// 1. Seed with the extension bands whose exact range is absent from `default`.
/// 2. Overlay `default` widest first, so narrower entries split the bands around them.
/// 3. Overlay `local` in canonical order; local always wins. Overlapping local entries
///    are tolerated, and the one later in canonical order takes the shared ports.
/// 4. Coalesce.
///
/// The result has no same-protocol overlaps and covers 1-65535 for every protocol.
pub fn reconcile(local: &PolicyMap, default: &PolicyMap) -> PolicyMap {
    let mut policy: PolicyMap = default_policy_extensions()
        .into_iter()
        .filter(|(range, _)| !default.contains(range))
        .collect();
    assert_no_overlaps(&policy);

    let mut by_span: Vec<(&PortRange, &str)> = default.iter().collect();
    by_span.sort_by(|(a, _), (b, _)| span_descending(a, b));
    for (range, label) in by_span {
        overlay_in_place(&mut policy, *range, label);
    }
    assert_no_overlaps(&policy);

    for (range, label) in local.iter() {
        overlay_in_place(&mut policy, *range, label);
    }

    let policy = coalesce(&policy);
    debug_assert!(
        Protocol::ALL
            .into_iter()
            .all(|protocol| coverage_gaps(&policy, protocol).is_empty()),
        "effective policy does not cover every port"
    );
    tracing::trace!("{}", dump_policy("Policy:", &policy));
    policy
}

/// Ports of `protocol` not covered by any entry, as `(from, to)` runs.
///
/// Expects a non-overlapping map.
pub fn coverage_gaps(policy: &PolicyMap, protocol: Protocol) -> Vec<(u16, u16)> {
    let mut gaps = Vec::new();
    let mut next = u32::from(MIN_PORT);
    for (range, _) in policy.iter_protocol(protocol) {
        let from = u32::from(range.from());
        if from > next {
            gaps.push((next as u16, (from - 1) as u16));
        }
        next = next.max(u32::from(range.to()) + 1);
    }
    if next <= u32::from(MAX_PORT) {
        gaps.push((next as u16, MAX_PORT));
    }
    gaps
}
