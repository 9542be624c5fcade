use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use colored::Colorize;
use recon_sqlite::{Db, ProbeResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use subdomain_enum::{ToolOutcome, TOOLS};
use tracing::info;

mod config;
mod logging;

const DEFAULT_DATABASE: &str = "recon.db";
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3600;
const SCRAPE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Parser)]
#[command(name = "recon", version, about = "Subdomain discovery and liveness probing pipeline")]
#[command(group(ArgGroup::new("input").required(true).multiple(true).args(["domain", "domain_file"])))]
struct Cli {
    /// Target domain
    #[arg(short, long)]
    domain: Option<String>,
    /// File with newline-delimited target domains (comments with # and blanks ignored)
    #[arg(long, value_name = "FILE")]
    domain_file: Option<PathBuf>,
    /// Chaos project discovery API key
    #[arg(long, value_name = "KEY")]
    chaos_key: Option<String>,
    /// Output database filename (default recon.db)
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,
    /// Timeout per enumeration tool in seconds (default 600)
    #[arg(long, value_name = "SECS")]
    tool_timeout_secs: Option<u64>,
    /// Timeout for the whole httpx pass in seconds (default 3600)
    #[arg(long, value_name = "SECS")]
    probe_timeout_secs: Option<u64>,
    /// Write probe results to a CSV file after the run
    #[arg(long, value_name = "FILE")]
    export_csv: Option<PathBuf>,
    /// Optional config file (YAML). If omitted, loads ./recon.yaml if present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();
    print_banner();

    let cfg = config::load_config(cli.config.as_deref()).unwrap_or_default();
    let database = cli
        .database
        .clone()
        .or(cfg.database)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
    let chaos_key = cli.chaos_key.clone().or(cfg.chaos_key);
    let tool_timeout = Duration::from_secs(
        cli.tool_timeout_secs
            .or(cfg.tool_timeout_secs)
            .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
    );
    let probe_timeout = Duration::from_secs(
        cli.probe_timeout_secs
            .or(cfg.probe_timeout_secs)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
    );

    let fresh = !database.exists();
    if fresh {
        println!("{}", "[*] Setting up database...".yellow());
    }
    let db = Db::open_or_create(&database)?;
    if fresh {
        info!(database = %database.display(), "database setup completed");
        println!("{}", "[*] Setup completed!".yellow());
    } else {
        info!(database = %database.display(), "database connection successful");
        println!("{}", "[*] Database connected!".yellow());
    }

    let domains = input_domains(&cli)?;
    let added = db.insert_domains(&domains)?;
    info!(requested = domains.len(), added, "domains ingested");

    // everything except the key itself goes into the run record
    let args_json = serde_json::json!({
        "domain": &cli.domain,
        "domain_file": cli.domain_file.as_ref().map(|p| p.display().to_string()),
        "database": database.display().to_string(),
        "tool_timeout_secs": tool_timeout.as_secs(),
        "probe_timeout_secs": probe_timeout.as_secs(),
        "chaos_key_present": chaos_key.is_some(),
    })
    .to_string();
    let run_id = db.begin_run(&args_json)?;
    info!(%run_id, "run started");

    let temp = recon_core::paths::temp_dir()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        scan_domains(&db, &temp, chaos_key.as_deref(), tool_timeout).await?;
        println!("{}", "[*] Scanning completed!".yellow());
        probe_subdomains(&db, &temp, probe_timeout).await?;
        println!("{}", "[*] Probing completed!".yellow());
        Ok::<(), anyhow::Error>(())
    })?;

    let domain_count = db.domain_count()?;
    let subdomain_count = db.raw_subdomain_count()?;
    let result_count = db.probe_result_count()?;
    db.finish_run(&run_id, domain_count, subdomain_count, result_count)?;
    info!(%run_id, domain_count, subdomain_count, result_count, "run finished");
    println!(
        "{}",
        format!(
            "[*] {} domains, {} subdomains, {} live services in {}",
            domain_count,
            subdomain_count,
            result_count,
            database.display()
        )
        .green()
    );

    if let Some(path) = &cli.export_csv {
        export_probe_csv(&db, path)?;
        println!(
            "{}",
            format!("[*] Probe results written to {}", path.display()).yellow()
        );
    }
    Ok(())
}

fn print_banner() {
    println!("{}", format!("recon v{}", recon_core::version()).cyan().bold());
    println!("{}", "subdomain discovery and liveness probing".cyan());
    println!();
}

/// Domains to scan, from `--domain` or `--domain-file`. The single domain
/// wins when both are given; a blank `--domain` counts as not given.
fn input_domains(cli: &Cli) -> Result<Vec<String>> {
    if let Some(domain) = &cli.domain {
        let domain = domain.trim();
        if !domain.is_empty() {
            return Ok(vec![domain.to_string()]);
        }
    }
    let path = match &cli.domain_file {
        Some(path) => path,
        None => bail!("either --domain or --domain-file is required"),
    };

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut domains = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        domains.push(t.to_string());
    }
    if domains.is_empty() {
        bail!("no domains found in {}", path.display());
    }
    Ok(domains)
}

/// Run every registry tool plus the rapiddns scrape for each stored domain,
/// importing candidates as they land.
async fn scan_domains(
    db: &Db,
    temp: &Path,
    chaos_key: Option<&str>,
    tool_timeout: Duration,
) -> Result<()> {
    let domains = db.domains()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
        .build()
        .context("building http client")?;

    for domain in &domains {
        for spec in TOOLS {
            println!("{}", format!("[*] {} scan", spec.name).yellow());
            let outcome = subdomain_enum::run_tool(spec, domain, temp, chaos_key, tool_timeout).await;
            if outcome == ToolOutcome::SkippedMissingKey {
                println!(
                    "{}",
                    format!("[!] No {} API key found, skipping", spec.name).yellow()
                );
                continue;
            }
            import_tool_output(db, temp, domain, spec.name)?;
        }

        println!("{}", "[*] rapiddns scan".yellow());
        let scraped = rapiddns::scrape_subdomains(&client, domain).await?;
        let path = recon_core::paths::tool_output_path(temp, domain, "rapiddns");
        recon_core::paths::write_lines(&path, &scraped)?;
        import_tool_output(db, temp, domain, "rapiddns")?;
    }
    Ok(())
}

/// Import one tool's output file into the store, echoing each candidate to
/// the terminal.
fn import_tool_output(db: &Db, temp: &Path, domain: &str, tool: &str) -> Result<()> {
    let lines = match subdomain_enum::read_tool_output(temp, domain, tool)? {
        Some(lines) => lines,
        None => return Ok(()),
    };
    for line in &lines {
        println!("{}", line);
    }
    let added = db.insert_raw_subdomains(&lines)?;
    info!(tool, domain, read = lines.len(), added, "imported tool output");
    Ok(())
}

/// Hand every stored candidate to httpx in one pass and persist whatever
/// answered.
async fn probe_subdomains(db: &Db, temp: &Path, probe_timeout: Duration) -> Result<()> {
    let candidates = db.raw_subdomains()?;
    if candidates.is_empty() {
        println!("{}", "[!] No subdomains to probe".yellow());
        info!("no candidates, skipping probe");
        return Ok(());
    }

    httpx_probe::write_candidates(temp, &candidates)?;
    httpx_probe::run_httpx(temp, probe_timeout).await;

    let probes = match httpx_probe::parse_output(temp)? {
        Some(probes) => probes,
        None => return Ok(()),
    };
    let rows: Vec<ProbeResult> = probes.iter().map(to_row).collect();
    let added = db.insert_probe_results(&rows)?;
    info!(parsed = rows.len(), added, "probe results stored");
    Ok(())
}

fn to_row(probe: &httpx_probe::Probe) -> ProbeResult {
    ProbeResult {
        scheme: probe.scheme.clone(),
        domain: probe.domain.clone(),
        port: probe.port,
        status_chain: probe.status_chain_json(),
        status_code: probe.status_code,
        title: probe.title.clone(),
        final_url: probe.final_url.clone(),
    }
}

/// Dump the probe_results table as CSV, one row per live (host, port).
fn export_probe_csv(db: &Db, path: &Path) -> Result<()> {
    let rows = db.probe_results()?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "scheme",
        "domain",
        "port",
        "status_chain",
        "status_code",
        "title",
        "final_url",
    ])?;
    for r in rows {
        wtr.write_record([
            r.scheme.unwrap_or_default(),
            r.domain,
            r.port.map(|p| p.to_string()).unwrap_or_default(),
            r.status_chain.unwrap_or_default(),
            r.status_code.map(|c| c.to_string()).unwrap_or_default(),
            r.title.unwrap_or_default(),
            r.final_url.unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(domain: Option<&str>, file: Option<PathBuf>) -> Cli {
        Cli {
            domain: domain.map(str::to_string),
            domain_file: file,
            chaos_key: None,
            database: None,
            tool_timeout_secs: None,
            probe_timeout_secs: None,
            export_csv: None,
            config: None,
        }
    }

    #[test]
    fn single_domain_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("domains.txt");
        std::fs::write(&list, "other.org\n").unwrap();

        let domains = input_domains(&cli_with(Some("example.com"), Some(list))).unwrap();
        assert_eq!(domains, ["example.com"]);
    }

    #[test]
    fn domain_file_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("domains.txt");
        std::fs::write(&list, "# targets\nexample.com\n\n  other.org  \n# done\n").unwrap();

        let domains = input_domains(&cli_with(None, Some(list))).unwrap();
        assert_eq!(domains, ["example.com", "other.org"]);
    }

    #[test]
    fn blank_domain_value_is_rejected() {
        assert!(input_domains(&cli_with(Some("   "), None)).is_err());
    }

    #[test]
    fn blank_domain_falls_back_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("domains.txt");
        std::fs::write(&list, "other.org\n").unwrap();

        let domains = input_domains(&cli_with(Some(""), Some(list))).unwrap();
        assert_eq!(domains, ["other.org"]);
    }

    #[test]
    fn empty_domain_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("domains.txt");
        std::fs::write(&list, "\n# nothing here\n").unwrap();

        assert!(input_domains(&cli_with(None, Some(list))).is_err());
    }

    #[test]
    fn probe_rows_carry_the_json_chain() {
        let probe = httpx_probe::Probe {
            scheme: Some("https".into()),
            domain: "a.example.com".into(),
            port: Some(443),
            status_code: Some(200),
            status_chain: Some(vec![301, 200]),
            title: Some("Home".into()),
            final_url: None,
        };
        let row = to_row(&probe);
        assert_eq!(row.status_chain.as_deref(), Some("[301,200]"));
        assert_eq!(row.domain, "a.example.com");
        assert_eq!(row.port, Some(443));
    }
}
