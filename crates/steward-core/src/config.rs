//! Operator configuration.
//!
//! Loaded from a TOML file or constructed with defaults. Durations are
//! written as human-friendly strings (`"5s"`, `"500ms"`) and parsed on
//! access.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the reconciliation engine and operations façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Timeout applied to every collaborator call (provisioning, health
    /// probes, backup transport). A timed-out call is a handler failure:
    /// the resource phase is left unchanged and the attempt is retried on
    /// the next reconcile.
    pub collaborator_timeout: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout: "5s".to_string(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: OperatorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The collaborator timeout as a `Duration` (5s if unparseable).
    pub fn collaborator_timeout(&self) -> Duration {
        parse_duration(&self.collaborator_timeout).unwrap_or(Duration::from_secs(5))
    }
}

/// Parse `"500ms"` / `"5s"` / `"2m"` style duration strings.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = s.strip_suffix('s') {
        return secs.parse::<u64>().ok().map(Duration::from_secs);
    }
    if let Some(mins) = s.strip_suffix('m') {
        return mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60));
    }
    None
}
