//! Workload IDs have the form `<name>/<instance>`.
//!
//! The name is the workload's definition name, the instance is whatever the
//! launching plugin reported. Only the first `/` separates the two parts, so
//! an instance may itself contain slashes.

use crate::error::WorkloadError;

/// Joins a workload name and instance into an ID.
pub fn build_id(name: &str, instance: &str) -> String {
    format!("{name}/{instance}")
}

/// Splits an ID into `(name, instance)`.
///
/// Both parts must be non-empty.
pub fn parse_id(id: &str) -> Result<(&str, &str), WorkloadError> {
    match id.split_once('/') {
        Some((name, instance)) if !name.is_empty() && !instance.is_empty() => Ok((name, instance)),
        _ => Err(WorkloadError::InvalidId { id: id.to_string() }),
    }
}
