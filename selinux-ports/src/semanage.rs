use std::path::{Path, PathBuf};

use port_policy_core::{OperationKind, PortOperation};

use crate::error::ToolError;
use crate::runner::{CommandRunner, ProcessRunner};

/// Which entries a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Local customizations only (`--locallist`).
    Local,
    /// Default and local policy together.
    All,
}

/// Thin wrapper over `semanage port`.
///
/// Every call is independent; callers that need a consistent view across calls
/// must serialize them.
#[derive(Debug, Clone)]
pub struct Semanage<R = ProcessRunner> {
    program: PathBuf,
    runner: R,
}

impl Semanage<ProcessRunner> {
    pub fn system(program: impl Into<PathBuf>) -> Self {
        Self::new(program, ProcessRunner)
    }
}

impl<R: CommandRunner> Semanage<R> {
    pub fn new(program: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Raw listing text, one `<type> <protocol> <ports>` line per entry.
    pub fn list(&self, scope: ListScope) -> Result<String, ToolError> {
        self.run(&list_args(scope))
    }

    /// Issue one add, modify or delete.
    pub fn apply(&self, operation: &PortOperation) -> Result<(), ToolError> {
        tracing::info!("{operation}");
        self.run(&operation_args(operation)).map(|_| ())
    }

    fn run(&self, args: &[String]) -> Result<String, ToolError> {
        let program = self.program.display().to_string();
        tracing::debug!(%program, args = %args.join(" "), "running semanage");

        let output = self
            .runner
            .run(&self.program, args)
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.success() {
            return Err(ToolError::Failed {
                program,
                args: args.join(" "),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|source| ToolError::Encoding {
            program,
            args: args.join(" "),
            source,
        })
    }
}

pub fn list_args(scope: ListScope) -> Vec<String> {
    let mut args = vec![
        "port".to_string(),
        "--noheading".to_string(),
        "--list".to_string(),
    ];
    if scope == ListScope::Local {
        args.push("--locallist".to_string());
    }
    args
}

/// `port -a|-m|-d -t <type> -p <protocol> <ports>`
pub fn operation_args(operation: &PortOperation) -> Vec<String> {
    let flag = match operation.kind {
        OperationKind::Add => "-a",
        OperationKind::Modify => "-m",
        OperationKind::Delete => "-d",
    };
    vec![
        "port".to_string(),
        flag.to_string(),
        "-t".to_string(),
        operation.label.clone(),
        "-p".to_string(),
        operation.range.protocol().to_string(),
        operation.range.port_spec(),
    ]
}
