pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE domains (
  domain          TEXT NOT NULL UNIQUE
);

CREATE TABLE raw_subdomains (
  subdomain       TEXT NOT NULL UNIQUE
);

CREATE TABLE probe_results (
  scheme          TEXT,
  domain          TEXT NOT NULL,
  port            INTEGER,
  status_chain    TEXT,
  status_code     INTEGER,
  title           TEXT,
  final_url       TEXT,
  UNIQUE (domain, port)
);

CREATE TABLE runs (
  run_id          TEXT PRIMARY KEY,
  started_at      INTEGER NOT NULL,
  finished_at     INTEGER,
  args_json       TEXT NOT NULL,
  domain_count    INTEGER DEFAULT 0,
  subdomain_count INTEGER DEFAULT 0,
  result_count    INTEGER DEFAULT 0
);

CREATE INDEX idx_probe_results_domain ON probe_results(domain);

COMMIT;
"#;
