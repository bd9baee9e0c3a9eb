use super::types::RunReport;
use anyhow::Result;
use std::path::Path;

/// Write the run as pretty-printed JSON
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    println!("    JSON report saved to: {}", path.display());
    Ok(())
}
