use crate::domain::ScoredLead;
use crate::error::Result;
use crate::pipeline::orchestrator::RunSummary;
use std::fs;
use std::path::{Path, PathBuf};

/// Write the ordered lead dataset. This file is the contract the dashboard
/// and report tooling consume; fixed name so re-runs overwrite in place.
pub fn write_leads(leads: &[ScoredLead], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("scored_leads.json");
    let json = serde_json::to_string_pretty(leads)?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Persist the run summary next to the dataset for later inspection.
pub fn write_summary(summary: &RunSummary, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("run_summary.json");
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Console table of the highest-priority leads.
pub fn render_top_leads(leads: &[ScoredLead], limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<5} {:<6} {:<32} {:<12} {}\n",
        "TIER", "SCORE", "COMPANY", "STAKEHOLDERS", "ID"
    ));
    for lead in leads.iter().take(limit) {
        out.push_str(&format!(
            "{:<5} {:<6} {:<32} {:<12} {}\n",
            format!("{:?}", lead.score.tier),
            lead.score.total,
            truncate(&lead.company.name, 32),
            lead.stakeholders.len(),
            lead.company.id,
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}
