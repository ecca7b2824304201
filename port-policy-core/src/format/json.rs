use crate::policy::PolicyMap;

/// Format a policy as a JSON array of `{from, to, protocol, label}` rows.
pub fn format_json(policy: &PolicyMap) -> String {
    serde_json::to_string_pretty(policy).unwrap_or_else(|_| "[]".to_string())
}
