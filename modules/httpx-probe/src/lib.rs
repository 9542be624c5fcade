//! Liveness probing with httpx: candidate handoff, launch, and tolerant
//! decoding of its JSON lines output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// Ports handed to httpx, the usual web-facing spread.
pub const CANDIDATE_PORTS: &str = "80,8080,8081,8443,443,7001,3000";

/// User agent httpx presents to probed hosts.
pub const PROBE_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:55.0) Gecko/20100101 Firefox/55.0";

/// Candidate hostnames handed to httpx with `-l`.
pub const CANDIDATES_FILE: &str = "raw_subdomains.txt";

/// File httpx writes its JSON lines output to.
pub const OUTPUT_FILE: &str = "httpx_subs.txt";

/// One JSON line of httpx output. Every field is optional so a sparse record
/// still decodes; unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpxRecord {
    pub url: Option<String>,
    pub scheme: Option<String>,
    // httpx has emitted the port both as a number and as a string across
    // versions, accept either
    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: Option<u16>,
    pub title: Option<String>,
    #[serde(rename = "status-code")]
    pub status_code: Option<i64>,
    #[serde(rename = "final-url")]
    pub final_url: Option<String>,
    #[serde(rename = "chain-status-codes")]
    pub chain_status_codes: Option<Vec<i64>>,
}

fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u16),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// A probe row ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub scheme: Option<String>,
    pub domain: String,
    pub port: Option<u16>,
    pub status_code: Option<i64>,
    pub status_chain: Option<Vec<i64>>,
    pub title: Option<String>,
    pub final_url: Option<String>,
}

impl Probe {
    /// Redirect chain rendered as compact JSON, `[301,200]` style.
    pub fn status_chain_json(&self) -> Option<String> {
        self.status_chain
            .as_ref()
            .and_then(|chain| serde_json::to_string(chain).ok())
    }
}

/// Split a probe URL into scheme, hostname and explicit port. The hostname
/// stops at the first `:` or `/` so paths never leak into it.
pub fn parse_url_host(url: &str) -> Option<(String, String, Option<u16>)> {
    let re = Regex::new(r"^(https?)://([^:/]+)(?::(\d+))?").unwrap();
    let caps = re.captures(url)?;
    let scheme = caps.get(1)?.as_str().to_string();
    let host = caps.get(2)?.as_str().to_string();
    let port = caps.get(3).and_then(|m| m.as_str().parse().ok());
    Some((scheme, host, port))
}

/// Turn one decoded record into a storable probe. `None` when the record has
/// no parseable URL, the one field a row cannot exist without. Scheme and
/// port prefer what the record says, falling back to the URL.
pub fn probe_from_record(record: &HttpxRecord) -> Option<Probe> {
    let url = record.url.as_deref()?;
    let (url_scheme, domain, url_port) = parse_url_host(url)?;
    Some(Probe {
        scheme: record.scheme.clone().or(Some(url_scheme)),
        domain,
        port: record.port.or(url_port),
        status_code: record.status_code,
        status_chain: record.chain_status_codes.clone(),
        title: record.title.clone(),
        final_url: record.final_url.clone(),
    })
}

/// Write the candidate list httpx reads with `-l`, one name per line.
pub fn write_candidates(temp_dir: &Path, subdomains: &[String]) -> Result<PathBuf> {
    let path = temp_dir.join(CANDIDATES_FILE);
    recon_core::paths::write_lines(&path, subdomains)?;
    Ok(path)
}

/// Argument list for the httpx invocation.
pub fn httpx_args(list: &Path, out: &Path) -> Vec<String> {
    vec![
        "-l".into(),
        list.to_string_lossy().into_owned(),
        "-silent".into(),
        "-H".into(),
        format!("User-Agent: {}", PROBE_USER_AGENT),
        "-ports".into(),
        CANDIDATE_PORTS.into(),
        "-status-code".into(),
        "-no-color".into(),
        "-follow-redirects".into(),
        "-title".into(),
        "-websocket".into(),
        "-json".into(),
        "-o".into(),
        out.to_string_lossy().into_owned(),
    ]
}

/// How the httpx launch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Completed { exit_code: Option<i32> },
    TimedOut,
    LaunchFailed,
}

/// Launch httpx over the candidates file and wait at most `wait` for it to
/// finish. Launch failures and expired deadlines become warnings, the
/// pipeline then carries on with whatever output exists.
pub async fn run_httpx(temp_dir: &Path, wait: Duration) -> ProbeOutcome {
    let list = temp_dir.join(CANDIDATES_FILE);
    let out = temp_dir.join(OUTPUT_FILE);

    let mut cmd = Command::new("httpx");
    cmd.args(httpx_args(&list, &out))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    info!("httpx has started");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(%err, "failed to launch httpx");
            return ProbeOutcome::LaunchFailed;
        }
    };
    match timeout(wait, child.wait()).await {
        Ok(Ok(status)) => {
            if status.success() {
                info!("httpx finished");
            } else {
                warn!(code = ?status.code(), "httpx exited with failure");
            }
            ProbeOutcome::Completed { exit_code: status.code() }
        }
        Ok(Err(err)) => {
            warn!(%err, "lost track of httpx process");
            ProbeOutcome::LaunchFailed
        }
        Err(_) => {
            warn!(timeout_secs = wait.as_secs(), "httpx deadline expired, killing");
            let _ = child.start_kill();
            ProbeOutcome::TimedOut
        }
    }
}

/// Decode the httpx output file into probes. `None` means the file does not
/// exist, which is what httpx leaves behind when nothing answered. Bad lines
/// are logged and skipped so one malformed record cannot sink the batch.
pub fn parse_output(temp_dir: &Path) -> Result<Option<Vec<Probe>>> {
    let path = temp_dir.join(OUTPUT_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("httpx wrote no output, nothing answered");
            return Ok(None);
        }
        Err(err) => return Err(err).context(format!("reading {}", path.display())),
    };

    let mut probes = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: HttpxRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(err) => {
                warn!(line = idx + 1, %err, "skipping undecodable httpx line");
                continue;
            }
        };
        match probe_from_record(&record) {
            Some(probe) => probes.push(probe),
            None => warn!(line = idx + 1, "skipping httpx record without a usable url"),
        }
    }
    info!(count = probes.len(), "httpx results decoded");
    Ok(Some(probes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parsing_strips_port_and_path() {
        assert_eq!(
            parse_url_host("https://sub.example.com:8443/path"),
            Some(("https".into(), "sub.example.com".into(), Some(8443)))
        );
        assert_eq!(
            parse_url_host("http://sub.example.com"),
            Some(("http".into(), "sub.example.com".into(), None))
        );
        assert_eq!(parse_url_host("ftp://sub.example.com"), None);
        assert_eq!(parse_url_host("sub.example.com"), None);
    }

    #[test]
    fn record_fields_win_over_url_derived_ones() {
        let record: HttpxRecord = serde_json::from_str(
            r#"{"url":"http://a.example.com:80","scheme":"https","port":443}"#,
        )
        .unwrap();
        let probe = probe_from_record(&record).unwrap();
        assert_eq!(probe.scheme.as_deref(), Some("https"));
        assert_eq!(probe.port, Some(443));
        assert_eq!(probe.domain, "a.example.com");
    }

    #[test]
    fn url_fills_in_what_the_record_lacks() {
        let record: HttpxRecord =
            serde_json::from_str(r#"{"url":"https://a.example.com:8443/login"}"#).unwrap();
        let probe = probe_from_record(&record).unwrap();
        assert_eq!(probe.scheme.as_deref(), Some("https"));
        assert_eq!(probe.port, Some(8443));
        assert_eq!(probe.domain, "a.example.com");
    }

    #[test]
    fn record_without_url_yields_no_probe() {
        let record: HttpxRecord = serde_json::from_str(r#"{"status-code":200}"#).unwrap();
        assert!(probe_from_record(&record).is_none());
    }

    #[test]
    fn port_decodes_from_number_or_string() {
        let r: HttpxRecord = serde_json::from_str(r#"{"port":8443}"#).unwrap();
        assert_eq!(r.port, Some(8443));
        let r: HttpxRecord = serde_json::from_str(r#"{"port":"8443"}"#).unwrap();
        assert_eq!(r.port, Some(8443));
        let r: HttpxRecord = serde_json::from_str(r#"{"port":"not-a-port"}"#).unwrap();
        assert_eq!(r.port, None);
        let r: HttpxRecord = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(r.port, None);
    }

    #[test]
    fn status_chain_renders_as_compact_json() {
        let record: HttpxRecord = serde_json::from_str(
            r#"{"url":"https://a.example.com","chain-status-codes":[301,200]}"#,
        )
        .unwrap();
        let probe = probe_from_record(&record).unwrap();
        assert_eq!(probe.status_chain_json().as_deref(), Some("[301,200]"));

        let record: HttpxRecord =
            serde_json::from_str(r#"{"url":"https://a.example.com"}"#).unwrap();
        let probe = probe_from_record(&record).unwrap();
        assert_eq!(probe.status_chain_json(), None);
    }

    #[test]
    fn httpx_args_match_the_known_invocation() {
        let args = httpx_args(
            Path::new("/tmp/raw_subdomains.txt"),
            Path::new("/tmp/httpx_subs.txt"),
        );
        assert_eq!(
            args,
            [
                "-l",
                "/tmp/raw_subdomains.txt",
                "-silent",
                "-H",
                "User-Agent: Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:55.0) Gecko/20100101 Firefox/55.0",
                "-ports",
                "80,8080,8081,8443,443,7001,3000",
                "-status-code",
                "-no-color",
                "-follow-redirects",
                "-title",
                "-websocket",
                "-json",
                "-o",
                "/tmp/httpx_subs.txt",
            ]
        );
    }

    #[test]
    fn missing_output_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_output(dir.path()).unwrap().is_none());
    }

    #[test]
    fn bad_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let lines = [
            r#"{"url":"https://a.example.com:443","scheme":"https","port":"443","status-code":200,"title":"Home"}"#,
            "not json at all {{{",
            r#"{"status-code":502}"#,
            "",
            r#"{"url":"http://b.example.com","status-code":301,"final-url":"https://b.example.com/","chain-status-codes":[301,200]}"#,
        ];
        std::fs::write(dir.path().join(OUTPUT_FILE), lines.join("\n")).unwrap();

        let probes = parse_output(dir.path()).unwrap().unwrap();
        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].domain, "a.example.com");
        assert_eq!(probes[0].port, Some(443));
        assert_eq!(probes[1].domain, "b.example.com");
        assert_eq!(probes[1].final_url.as_deref(), Some("https://b.example.com/"));
    }

    #[test]
    fn candidates_file_lands_in_the_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_candidates(
            dir.path(),
            &["a.example.com".to_string(), "b.example.com".to_string()],
        )
        .unwrap();
        assert_eq!(path, dir.path().join(CANDIDATES_FILE));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a.example.com\nb.example.com\n");
    }
}
