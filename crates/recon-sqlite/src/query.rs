use crate::{Db, ProbeResult};
use anyhow::Result;

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn domains(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT domain FROM domains")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
    }

    pub fn raw_subdomains(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT subdomain FROM raw_subdomains")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
    }

    pub fn probe_results(&self) -> Result<Vec<ProbeResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT scheme, domain, port, status_chain, status_code, title, final_url
             FROM probe_results",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(ProbeResult {
                scheme: r.get(0)?,
                domain: r.get(1)?,
                port: r.get(2)?,
                status_chain: r.get(3)?,
                status_code: r.get(4)?,
                title: r.get(5)?,
                final_url: r.get(6)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn domain_count(&self) -> Result<i64> {
        self.scalar("SELECT COUNT(1) FROM domains")
    }

    pub fn raw_subdomain_count(&self) -> Result<i64> {
        self.scalar("SELECT COUNT(1) FROM raw_subdomains")
    }

    pub fn probe_result_count(&self) -> Result<i64> {
        self.scalar("SELECT COUNT(1) FROM probe_results")
    }

    fn scalar(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |r| r.get(0))?)
    }
}
