use anyhow::{Context, Result};
use clap::Parser;
use selinux_ports::config::{default_config, load_config};
use selinux_ports::context::PortPolicyContext;
use selinux_ports::logging::init_cli_logger;

mod cli;
mod configure_cmd;
mod list_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => default_config(),
    };
    let program = config.resolve_semanage(cli.semanage.as_deref());
    tracing::debug!(program = %program.display(), "using semanage");
    let context = PortPolicyContext::with_program(program);

    match cli.command {
        Command::List(args) => list_cmd::run_list(&context, args),
        Command::Configure(args) => configure_cmd::run_configure(&context, args),
        Command::Check(args) => configure_cmd::run_check(&context, args),
    }
}
