use std::io;
use std::string::FromUtf8Error;

use port_policy_core::{ConfigureError, ParseError, PortOperation};
use thiserror::Error;

/// Failures talking to the `semanage` executable.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program} {args}` failed with {}: {stderr}", describe_status(.status))]
    Failed {
        program: String,
        args: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("`{program} {args}` printed non-UTF-8 output")]
    Encoding {
        program: String,
        args: String,
        #[source]
        source: FromUtf8Error,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// Everything the policy context can fail with.
#[derive(Debug, Error)]
pub enum PortPolicyError {
    #[error("failed to parse semanage port listing: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Configure(#[from] ConfigureError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// An operation failed part-way through `configure`. Earlier operations stay
    /// applied.
    #[error("{operation} failed after {applied} earlier change(s) were applied: {source}")]
    Apply {
        operation: PortOperation,
        applied: usize,
        #[source]
        source: ToolError,
    },
}
