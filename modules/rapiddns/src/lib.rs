//! Subdomain harvesting from the rapiddns.io results table.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::info;

/// Fetch the rapiddns.io listing for `domain` and return the subdomains in
/// its results table. Network errors and HTTP error statuses bubble up; the
/// source is best effort and callers decide how hard to fail.
pub async fn scrape_subdomains(client: &Client, domain: &str) -> Result<Vec<String>> {
    let url = format!("https://rapiddns.io/subdomain/{}?full=1#result", domain);
    info!(%url, "fetching rapiddns page");

    let res = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()?;
    let html = res.text().await.context("reading rapiddns body")?;

    let subdomains = extract_subdomains(&html)?;
    info!(domain, count = subdomains.len(), "rapiddns rows extracted");
    Ok(subdomains)
}

/// Pull the first cell of every row of the first results table; any further
/// tables on the page are ignored. A page without a results table is an
/// error so a silent site redesign cannot pass for an empty result.
pub fn extract_subdomains(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);

    let table = Selector::parse("table tbody").unwrap();
    let body = match document.select(&table).next() {
        Some(body) => body,
        None => bail!("no results table in page, rapiddns layout may have changed"),
    };

    let rows = Selector::parse("tr").unwrap();
    let cell = Selector::parse("td").unwrap();

    let mut subdomains = Vec::new();
    for row in body.select(&rows) {
        if let Some(first) = row.select(&cell).next() {
            let text = first.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                subdomains.push(text.to_string());
            }
        }
    }
    Ok(subdomains)
}
