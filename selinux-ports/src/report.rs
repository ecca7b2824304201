use colored::Colorize;
use port_policy_core::{format_operations, format_policy, format_summary, PolicyMap, PortOperation};

/// Render a policy for terminal output, type column highlighted.
pub fn render_policy(policy: &PolicyMap) -> String {
    format_policy(policy)
        .lines()
        .map(|line| match line.split_once('=') {
            Some((range, label)) => format!("{range}={}", label.bold()),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render per-protocol entry counts.
pub fn render_summary(policy: &PolicyMap) -> String {
    format_summary(policy).cyan().to_string()
}

/// Render planned or issued operations.
pub fn render_operations(operations: &[PortOperation]) -> String {
    let raw = format_operations(operations);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else {
            line.to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render the final `changed=` line.
pub fn render_changed(changed: bool) -> String {
    let line = format!("changed={changed}");
    if changed {
        line.yellow().to_string()
    } else {
        line.green().to_string()
    }
}
