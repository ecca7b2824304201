//! Policy and operation output formatters.

pub mod json;
pub mod text;

pub use json::format_json;
pub use text::{format_operations, format_policy, format_summary};
