use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use port_policy_core::Protocol;

#[derive(Parser, Debug)]
#[command(name = "selinux-ports")]
#[command(about = "Inspect and reconcile SELinux port labels")]
pub struct Cli {
    /// Optional TOML config file. Defaults to the embedded configuration.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// semanage executable, overrides the config file.
    #[arg(long, global = true)]
    pub semanage: Option<PathBuf>,
    /// Log planning decisions and semanage invocations.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Show the effective port policy, or just its local or default part.
    List(ListArgs),
    /// Make a set of ports exactly the local ports of one type.
    Configure(ConfigureArgs),
    /// Validate a set of ports for one type against local policy.
    Check(CheckArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only entries added by administrators.
    #[arg(long, conflicts_with = "default")]
    pub local: bool,
    /// Only entries shipped with the system policy.
    #[arg(long, conflicts_with = "local")]
    pub default: bool,
    /// Only entries of this type.
    #[arg(long)]
    pub label: Option<String>,
    /// Only entries of this protocol.
    #[arg(long, value_parser = parse_protocol)]
    pub protocol: Option<Protocol>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// SELinux type, for example `http_port_t`.
    pub label: String,
    /// Port lists such as `8080/tcp` or `22,8008-8010/tcp`. None removes every local
    /// port of the type.
    pub ports: Vec<String>,
    /// Protocol for port lists given without a `/protocol` suffix.
    #[arg(long, value_parser = parse_protocol)]
    pub protocol: Option<Protocol>,
    /// Print the operations without issuing them.
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub label: String,
    #[arg(required = true)]
    pub ports: Vec<String>,
    #[arg(long, value_parser = parse_protocol)]
    pub protocol: Option<Protocol>,
}

fn parse_protocol(raw: &str) -> Result<Protocol, String> {
    raw.parse().map_err(|err| format!("{err}"))
}
