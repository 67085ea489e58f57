//! Diagnostic status report.

use std::fmt;

use url::Url;

use super::PollState;
use crate::monitor::{AllowList, Snapshot};

/// Point-in-time view of the engine for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Endpoint being polled.
    pub endpoint: Url,
    /// Loop state.
    pub state: PollState,
    /// Number of tracked bases.
    pub tracked: usize,
    /// Whether the last payload had an unrecognized shape.
    pub degraded: bool,
    /// Configured allow-list entries; empty means every station.
    pub allow_list: Vec<String>,
    /// Exact allow-list entries never seen upstream.
    pub missing: Vec<String>,
}

impl StatusReport {
    pub(super) fn collect(
        endpoint: &Url,
        state: PollState,
        snapshot: &Snapshot,
        allow: Option<&AllowList>,
    ) -> Self {
        let (allow_list, missing) = allow.map_or_else(Default::default, |allow| {
            let missing: Vec<String> = allow
                .exact_entries()
                .filter(|key| !snapshot.contains_key(key))
                .map(ToString::to_string)
                .collect();
            (allow.entries().to_vec(), missing)
        });

        Self {
            endpoint: endpoint.clone(),
            state,
            tracked: snapshot.len(),
            degraded: snapshot.unindexed().is_some(),
            allow_list,
            missing,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Endpoint: {}", self.endpoint)?;
        writeln!(f, "State: {}", self.state)?;
        writeln!(f, "Bases tracked: {}", self.tracked)?;
        if self.degraded {
            writeln!(f, "Payload shape: unrecognized (alerts paused)")?;
        }
        if self.allow_list.is_empty() {
            writeln!(f, "Stations: all")?;
        } else {
            writeln!(f, "Stations: {}", self.allow_list.join(", "))?;
        }
        if !self.missing.is_empty() {
            writeln!(f, "Not seen upstream: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}
