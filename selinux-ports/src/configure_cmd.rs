use std::collections::BTreeSet;

use anyhow::{Context, Result};
use port_policy_core::{parse_port_list, PortOperation, PortRange, Protocol};
use selinux_ports::context::PortPolicyContext;
use selinux_ports::report::{render_changed, render_operations};
use serde::Serialize;

use crate::cli::{CheckArgs, ConfigureArgs, OutputFormat};

#[derive(Debug, Serialize)]
struct ConfigureReport<'a> {
    label: &'a str,
    dry_run: bool,
    changed: bool,
    operations: &'a [PortOperation],
}

pub fn run_configure(context: &PortPolicyContext, args: ConfigureArgs) -> Result<()> {
    let desired = desired_ranges(&args.ports, args.protocol)?;
    let operations = if args.dry_run {
        context.plan_configure(&desired, &args.label)
    } else {
        context.apply_configuration(&desired, &args.label)
    }
    .with_context(|| format!("failed to configure ports of type {}", args.label))?;
    let changed = !operations.is_empty();

    match args.format {
        OutputFormat::Text => {
            if changed {
                println!("{}", render_operations(&operations));
            }
            println!("{}", render_changed(changed));
        }
        OutputFormat::Json => {
            let report = ConfigureReport {
                label: &args.label,
                dry_run: args.dry_run,
                changed,
                operations: &operations,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

pub fn run_check(context: &PortPolicyContext, args: CheckArgs) -> Result<()> {
    let desired = desired_ranges(&args.ports, args.protocol)?;
    context
        .check(&desired, &args.label)
        .with_context(|| format!("ports rejected for type {}", args.label))?;
    println!("ok label={} ranges={}", args.label, desired.len());
    Ok(())
}

/// Collect `22,8008-8010/tcp` style arguments. Lists without a `/protocol` suffix use
/// `protocol`.
fn desired_ranges(ports: &[String], protocol: Option<Protocol>) -> Result<BTreeSet<PortRange>> {
    let mut desired = BTreeSet::new();
    for arg in ports {
        let (list, protocol) = match arg.rsplit_once('/') {
            Some((list, name)) => {
                let protocol: Protocol = name
                    .parse()
                    .with_context(|| format!("invalid port argument {arg:?}"))?;
                (list, protocol)
            }
            None => {
                let protocol = protocol.with_context(|| {
                    format!("port argument {arg:?} needs a /protocol suffix or --protocol")
                })?;
                (arg.as_str(), protocol)
            }
        };
        let ranges = parse_port_list(list, protocol)
            .with_context(|| format!("invalid port argument {arg:?}"))?;
        desired.extend(ranges);
    }
    Ok(desired)
}
