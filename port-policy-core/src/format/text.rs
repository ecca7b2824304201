use crate::configure::{OperationKind, PortOperation};
use crate::policy::PolicyMap;
use crate::range::Protocol;

/// One `range=type` line per entry, e.g. `512-537/tcp=hi_reserved_port_t`.
pub fn format_policy(policy: &PolicyMap) -> String {
    policy
        .iter()
        .map(|(range, label)| format!("{range}={label}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Operations as `+` add, `~` modify and `-` delete lines.
pub fn format_operations(operations: &[PortOperation]) -> String {
    operations
        .iter()
        .map(|op| {
            let marker = match op.kind {
                OperationKind::Add => '+',
                OperationKind::Modify => '~',
                OperationKind::Delete => '-',
            };
            format!("{marker} {}={}", op.range, op.label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-protocol entry counts.
pub fn format_summary(policy: &PolicyMap) -> String {
    let counts: Vec<String> = Protocol::ALL
        .into_iter()
        .map(|protocol| format!("{protocol}={}", policy.iter_protocol(protocol).count()))
        .collect();
    format!("entries={} {}", policy.len(), counts.join(" "))
}
