use anyhow::{anyhow, Context, Result};
use regping_model::Target;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Upstream endpoints document mapping region ids to entrypoints.
pub const CLOUD_REGIONS_URL: &str = "https://gcping.com/api/endpoints";

/// Fetch the region registry and return its entries ordered by region id.
pub fn fetch_registry(url: &str, timeout: Duration) -> Result<Vec<Target>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build registry HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch region registry from {url}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!(
            "registry request to {url} returned HTTP status {status}"
        ));
    }

    let body = response
        .text()
        .with_context(|| format!("failed to read region registry from {url}"))?;
    parse_registry(&body).with_context(|| format!("failed to parse region registry from {url}"))
}

/// Load the same registry document from a local file.
pub fn load_registry_file(path: &Path) -> Result<Vec<Target>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read registry file {path:?}"))?;
    parse_registry(&contents).with_context(|| format!("failed to parse registry file {path:?}"))
}

/// Parse the endpoints document: a JSON object keyed by region id. Entries
/// come back ordered by region id so runs are deterministic.
pub fn parse_registry(json: &str) -> Result<Vec<Target>> {
    let entries: BTreeMap<String, Target> = serde_json::from_str(json)?;
    Ok(entries.into_values().collect())
}

/// Registry entries matching a caller's region names, plus the names that
/// matched nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub targets: Vec<Target>,
    pub unknown: Vec<String>,
}

/// Select the entries whose id appears in `names`, preserving registry
/// order. With no names, every entry is selected.
pub fn select_targets(registry: &[Target], names: &[String]) -> Selection {
    if names.is_empty() {
        return Selection {
            targets: registry.to_vec(),
            unknown: Vec::new(),
        };
    }

    let targets = registry
        .iter()
        .filter(|target| names.iter().any(|name| name == &target.id))
        .cloned()
        .collect();
    let unknown = names
        .iter()
        .filter(|name| !registry.iter().any(|target| &target.id == *name))
        .cloned()
        .collect();

    Selection { targets, unknown }
}
