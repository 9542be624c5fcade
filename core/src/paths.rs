//! Temp-file conventions shared by the tool runner, the scraper, and the
//! importer. Every external artifact lives under one `temp/` directory next
//! to the executable, one text file per (domain, tool) pair.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Resolve (and create if needed) the shared temp directory next to the
/// running executable.
pub fn temp_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate current executable")?;
    let dir = exe
        .parent()
        .map(|p| p.join("temp"))
        .unwrap_or_else(|| PathBuf::from("temp"));
    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create temp directory {}", dir.display()))?;
    Ok(dir)
}

/// Path of the output file for one (domain, tool) pair: `<domain>_<tool>.txt`.
pub fn tool_output_path(dir: &Path, domain: &str, tool: &str) -> PathBuf {
    dir.join(format!("{}_{}.txt", domain, tool))
}

/// Write lines as newline-terminated plain text, replacing any previous file.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut file =
        fs::File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}
