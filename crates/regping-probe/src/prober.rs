use anyhow::{anyhow, Context, Result};
use regping_model::Target;
use std::time::{Duration, Instant};

/// Path probed on every region entrypoint.
const PING_PATH: &str = "/api/ping";

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Bound on one probe's round trip, connection setup included.
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// One timed round trip against a target.
///
/// Implementations must tolerate being called from worker threads when a
/// cycle probes targets concurrently.
pub trait RegionProber: Send + Sync {
    /// Returns the elapsed round-trip time in milliseconds, or an error for
    /// any per-sample failure (timeout, transport error, bad status).
    fn probe(&self, target: &Target) -> Result<f64>;
}

/// Prober that times an HTTP GET against the region's ping endpoint.
pub struct HttpProber {
    client: reqwest::blocking::Client,
}

impl HttpProber {
    /// One pooled client serves the whole run, so connections stay open
    /// between cycles and later samples measure the round trip rather than
    /// connection setup.
    pub fn new(settings: &ProbeSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build probe HTTP client")?;
        Ok(Self { client })
    }
}

impl RegionProber for HttpProber {
    fn probe(&self, target: &Target) -> Result<f64> {
        let url = ping_url(target);

        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        // Drain the body so the measurement covers the full response.
        response
            .bytes()
            .with_context(|| format!("failed to read response from {url}"))?;
        let elapsed = start.elapsed();

        if !status.is_success() {
            return Err(anyhow!("unexpected HTTP status from {url}: {status}"));
        }
        Ok(elapsed.as_secs_f64() * 1000.0)
    }
}

fn ping_url(target: &Target) -> String {
    format!("{}{}", target.url.trim_end_matches('/'), PING_PATH)
}
