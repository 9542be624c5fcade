use serde::{Deserialize, Serialize};

/// One row of the probe_results table: the liveness record for a single
/// (host, port) pair. Everything the prober could not determine stays None
/// and is stored as NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub scheme: Option<String>,
    pub domain: String,
    pub port: Option<u16>,
    pub status_chain: Option<String>,
    pub status_code: Option<i64>,
    pub title: Option<String>,
    pub final_url: Option<String>,
}
