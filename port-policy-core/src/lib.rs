//! Port label policy reconciliation for SELinux.
//!
//! SELinux keeps two overlapping sources of port labels: the default policy shipped
//! with the system and the local policy added by administrators. This crate turns
//! their textual listings into one non-overlapping, fully covering view and plans
//! the `semanage port` operations needed to give a type exactly a desired set of
//! ports. It performs no I/O.

pub mod coalesce;
pub mod configure;
pub mod format;
pub mod listing;
pub mod overlay;
pub mod policy;
pub mod range;
pub mod reconcile;

pub use coalesce::{coalesce, coalesce_ranges};
pub use configure::{
    check_conflicts, find_conflicts, plan_configure, plan_operations, validate_desired,
    ConfigureError, OperationKind, PortOperation,
};
pub use format::{format_json, format_operations, format_policy, format_summary};
pub use listing::{
    parse_default_policy, parse_listing, parse_local_policy, parse_port_list, ParseError,
};
pub use overlay::overlay;
pub use policy::{assert_no_overlaps, dump_policy, filter_by_label, find_overlaps, PolicyMap};
pub use range::{span_descending, PortRange, Protocol, RangeError, MAX_PORT, MIN_PORT};
pub use reconcile::{coverage_gaps, default_policy_extensions, reconcile};
