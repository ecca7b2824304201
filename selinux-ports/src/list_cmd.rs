use anyhow::{Context, Result};
use port_policy_core::{format_json, PolicyMap, Protocol};
use selinux_ports::context::PortPolicyContext;
use selinux_ports::report::{render_policy, render_summary};

use crate::cli::{ListArgs, OutputFormat};

pub fn run_list(context: &PortPolicyContext, args: ListArgs) -> Result<()> {
    let (policy, which) = if args.local {
        (context.local_policy(), "local")
    } else if args.default {
        (context.default_policy(), "default")
    } else {
        (context.get_effective_policy(), "effective")
    };
    let policy = policy.with_context(|| format!("failed to read {which} port policy"))?;
    let policy = select(policy, args.label.as_deref(), args.protocol);

    match args.format {
        OutputFormat::Text => {
            if !policy.is_empty() {
                println!("{}", render_policy(&policy));
            }
            println!("{}", render_summary(&policy));
        }
        OutputFormat::Json => println!("{}", format_json(&policy)),
    }
    Ok(())
}

fn select(policy: PolicyMap, label: Option<&str>, protocol: Option<Protocol>) -> PolicyMap {
    policy
        .into_iter()
        .filter(|(range, entry_label)| {
            label.is_none_or(|wanted| wanted == entry_label.as_str())
                && protocol.is_none_or(|wanted| wanted == range.protocol())
        })
        .collect()
}
