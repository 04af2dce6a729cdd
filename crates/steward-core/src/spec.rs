//! The open-schema desired-state mapping for a database resource.
//!
//! A spec is a set of unique keys with JSON values. Three keys are required
//! at creation time (`engine`, `version`, `storage`, all strings); everything
//! else is engine-specific and passes through untouched. Spec updates are
//! accepted as a diff-then-merge: the changed-key set decides whether an
//! update bumps the generation at all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OperatorError, OperatorResult};

/// Keys every spec must carry, as non-empty strings.
pub const REQUIRED_KEYS: [&str; 3] = ["engine", "version", "storage"];

/// Desired-state mapping for a managed database.
///
/// Backed by a `BTreeMap` so iteration (and therefore diff output) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseSpec(BTreeMap<String, Value>);

impl DatabaseSpec {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a raw value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a key, replacing any existing value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// The database engine, e.g. `postgresql` or `redis`.
    pub fn engine(&self) -> Option<&str> {
        self.0.get("engine").and_then(Value::as_str)
    }

    /// The requested engine version.
    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    /// The requested storage size, e.g. `100Gi`.
    pub fn storage(&self) -> Option<&str> {
        self.0.get("storage").and_then(Value::as_str)
    }

    /// The requested replica count. Defaults to 1 when unset.
    pub fn replicas(&self) -> u64 {
        self.0
            .get("replicas")
            .and_then(Value::as_u64)
            .unwrap_or(1)
    }

    /// Validate that all required keys are present and are non-empty strings.
    pub fn validate(&self) -> OperatorResult<()> {
        for key in REQUIRED_KEYS {
            match self.0.get(key) {
                None => {
                    return Err(OperatorError::Validation(format!(
                        "missing required field: {key}"
                    )));
                }
                Some(Value::String(s)) if s.is_empty() => {
                    return Err(OperatorError::Validation(format!(
                        "required field '{key}' is empty"
                    )));
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(OperatorError::Validation(format!(
                        "required field '{key}' must be a string"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Compute the set of keys in `other` whose value differs from this spec.
    ///
    /// Keys absent here but present in `other` count as changed. The result
    /// is sorted (BTreeMap iteration order).
    pub fn diff(&self, other: &DatabaseSpec) -> Vec<String> {
        other
            .0
            .iter()
            .filter(|(key, value)| self.0.get(*key) != Some(value))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Merge `other` into this spec: new keys are added, existing keys are
    /// overwritten, keys absent from `other` are left untouched.
    pub fn merge(&mut self, other: DatabaseSpec) {
        self.0.extend(other.0);
    }

    /// Iterate over all key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DatabaseSpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres_spec() -> DatabaseSpec {
        DatabaseSpec::from_iter([
            ("engine", "postgresql"),
            ("version", "14.9"),
            ("storage", "100Gi"),
        ])
    }

    #[test]
    fn valid_spec_passes_validation() {
        assert!(postgres_spec().validate().is_ok());
    }

    #[test]
    fn missing_required_key_fails_validation() {
        for key in REQUIRED_KEYS {
            let mut spec = postgres_spec();
            spec.0.remove(key);
            let err = spec.validate().unwrap_err();
            assert!(
                matches!(err, OperatorError::Validation(_)),
                "expected validation error for missing '{key}'"
            );
        }
    }

    #[test]
    fn non_string_required_key_fails_validation() {
        let mut spec = postgres_spec();
        spec.set("version", 14);
        assert!(matches!(
            spec.validate(),
            Err(OperatorError::Validation(_))
        ));
    }

    #[test]
    fn accessors_read_required_keys() {
        let spec = postgres_spec();
        assert_eq!(spec.engine(), Some("postgresql"));
        assert_eq!(spec.version(), Some("14.9"));
        assert_eq!(spec.storage(), Some("100Gi"));
    }

    #[test]
    fn replicas_defaults_to_one() {
        let mut spec = postgres_spec();
        assert_eq!(spec.replicas(), 1);
        spec.set("replicas", 3);
        assert_eq!(spec.replicas(), 3);
    }

    #[test]
    fn diff_reports_changed_keys_only() {
        let spec = postgres_spec();
        let mut update = postgres_spec();
        update.set("version", "15.0");
        update.set("backup_schedule", "nightly");

        let changed = spec.diff(&update);
        assert_eq!(changed, vec!["backup_schedule", "version"]);
    }

    #[test]
    fn diff_of_identical_spec_is_empty() {
        let spec = postgres_spec();
        assert!(spec.diff(&postgres_spec()).is_empty());
    }

    #[test]
    fn merge_overwrites_and_adds() {
        let mut spec = postgres_spec();
        let mut update = DatabaseSpec::new();
        update.set("version", "15.0");
        update.set("replicas", 5);

        spec.merge(update);
        assert_eq!(spec.version(), Some("15.0"));
        assert_eq!(spec.replicas(), 5);
        // Untouched keys survive.
        assert_eq!(spec.engine(), Some("postgresql"));
    }
}
