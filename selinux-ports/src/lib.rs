//! SELinux port labeling through `semanage port`.
//!
//! [`port_policy_core`] does the pure work of parsing listings, reconciling default
//! and local policy and planning changes. This crate adds what touches the system:
//!
//! - [`runner`] and [`semanage`] run the external tool and surface its failures.
//! - [`context`] owns the lock that serializes reads and configures, and exposes
//!   effective-policy queries and `configure`.
//! - [`config`] locates the `semanage` executable.
//! - [`report`] and [`logging`] cover terminal output.
//!
//! # Examples
//!
//! ```ignore
//! use std::collections::BTreeSet;
//! use selinux_ports::context::PortPolicyContext;
//!
//! let context = PortPolicyContext::with_program("/usr/sbin/semanage");
//! let desired = BTreeSet::from(["8080-8081/tcp".parse()?]);
//! let changed = context.configure(&desired, "http_port_t")?;
//! let effective = context.get_effective_policy()?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
pub mod semanage;

pub use context::PortPolicyContext;
pub use error::{PortPolicyError, ToolError};
