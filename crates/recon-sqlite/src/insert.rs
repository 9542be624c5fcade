use crate::{Db, ProbeResult};
use anyhow::Result;
use rusqlite::params;
use time::OffsetDateTime;
use uuid::Uuid;

impl Db {
    pub fn begin_run(&self, args_json: &str) -> Result<Uuid> {
        let run_id = Uuid::now_v7();
        let started_at = OffsetDateTime::now_utc().unix_timestamp();
        self.conn.execute(
            "INSERT INTO runs(run_id, started_at, args_json) VALUES (?,?,?)",
            params![run_id.to_string(), started_at, args_json],
        )?;
        Ok(run_id)
    }

    pub fn finish_run(&self, run_id: &Uuid, domains: i64, subdomains: i64, results: i64) -> Result<()> {
        let finished_at = OffsetDateTime::now_utc().unix_timestamp();
        self.conn.execute(
            "UPDATE runs SET finished_at=?, domain_count=?, subdomain_count=?, result_count=? WHERE run_id=?",
            params![finished_at, domains, subdomains, results, run_id.to_string()],
        )?;
        Ok(())
    }

    /// Insert input domains, ignoring any already present. Returns how many
    /// rows were actually added.
    pub fn insert_domains(&self, domains: &[String]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO domains(domain) VALUES (?)")?;
            for domain in domains {
                added += stmt.execute(params![domain])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    /// Insert candidate subdomains; the UNIQUE constraint is the only
    /// deduplication mechanism, so repeats across tools collapse silently.
    pub fn insert_raw_subdomains(&self, subdomains: &[String]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO raw_subdomains(subdomain) VALUES (?)")?;
            for subdomain in subdomains {
                added += stmt.execute(params![subdomain])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    /// Batch-insert probe rows. A row whose (domain, port) key already
    /// exists is dropped, keeping the first observation.
    pub fn insert_probe_results(&self, rows: &[ProbeResult]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO probe_results(scheme,domain,port,status_chain,status_code,title,final_url)
                 VALUES (?,?,?,?,?,?,?)",
            )?;
            for row in rows {
                added += stmt.execute(params![
                    row.scheme,
                    row.domain,
                    row.port,
                    row.status_chain,
                    row.status_code,
                    row.title,
                    row.final_url
                ])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }
}
