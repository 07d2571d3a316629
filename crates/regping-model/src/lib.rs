//! Shared data structures for regping.

use serde::{Deserialize, Serialize};

/// One probe-able region endpoint from the registry.
///
/// Field names follow the upstream endpoints document, which is a JSON
/// object keyed by region id with one of these entries per region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    #[serde(rename = "Region")]
    pub id: String,
    #[serde(rename = "RegionName")]
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Per-target round-trip times in milliseconds, one entry per probe, in
/// cycle order.
///
/// `None` marks a probe that failed or timed out. Failed probes keep their
/// slot, so sample i always corresponds to cycle i.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SampleSet {
    pub rtt_ms: Vec<Option<f64>>,
}

impl SampleSet {
    pub fn push(&mut self, rtt_ms: Option<f64>) {
        self.rtt_ms.push(rtt_ms);
    }

    pub fn len(&self) -> usize {
        self.rtt_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rtt_ms.is_empty()
    }

    /// Number of probes that came back with a measurement.
    pub fn ok_count(&self) -> usize {
        self.rtt_ms.iter().filter(|rtt| rtt.is_some()).count()
    }

    /// Outcome of the most recent probe, if any has run.
    pub fn last(&self) -> Option<Option<f64>> {
        self.rtt_ms.last().copied()
    }
}
