use crate::domain::{Company, EnrichmentStatus, SizeBucket, Stakeholder};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One raw record from the exhibitor feed. Everything except the name is
/// optional; a record without a usable name is malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCompanyRecord {
    pub name: Option<String>,
    pub event: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub booth: Option<String>,
    pub employees: Option<u32>,
    pub engagement: Option<f64>,
    #[serde(default)]
    pub contacts: Vec<RawContact>,
}

/// Event-provided contact as it appears in the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContact {
    pub name: String,
    pub title: String,
}

/// Stable company identifier derived from name + event: a readable slug
/// plus a short sha256 suffix so re-sourcing yields the same id.
pub fn derive_company_id(name: &str, event: &str) -> String {
    let mut slug = String::new();
    let mut prev_dash = true;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(event.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}-{}", slug, &digest[..12])
}

/// Result of loading the raw feed: deduplicated companies plus the reasons
/// for every skipped record. Skips never abort a load.
#[derive(Debug)]
pub struct SourceOutcome {
    pub companies: Vec<Company>,
    pub skipped: Vec<String>,
}

/// Build a `Company` from one raw record. `default_event` applies when the
/// record carries no event of its own.
pub fn company_from_record(record: &RawCompanyRecord, default_event: &str) -> Result<Company> {
    let name = record
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PipelineError::MalformedRecord("record has no company name".to_string()))?;

    let event = record
        .event
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(default_event);

    // Event-provided signals are seeded into the attribute bag so the
    // resolver and scorer read one surface regardless of provider.
    let mut attributes = BTreeMap::new();
    if let Some(engagement) = record.engagement {
        attributes.insert("engagement".to_string(), serde_json::json!(engagement));
    }
    if !record.contacts.is_empty() {
        attributes.insert(
            "contacts".to_string(),
            serde_json::to_value(&record.contacts)?,
        );
    }

    Ok(Company {
        id: derive_company_id(name, event),
        name: name.to_string(),
        industry: record.industry.clone(),
        size: SizeBucket::from_employees(record.employees),
        description: record.description.clone().unwrap_or_default(),
        website: record.website.clone(),
        source_event: event.to_string(),
        booth: record.booth.clone(),
        status: EnrichmentStatus::Pending,
        attributes,
        sourced_at: Utc::now(),
        enriched_at: None,
    })
}

/// Load the JSON exhibitor feed. Duplicate ids are last-write-wins; the
/// replacement keeps the first occurrence's position so ordering stays
/// stable across runs.
pub fn load_companies(path: &Path, default_event: &str) -> Result<SourceOutcome> {
    let content = fs::read_to_string(path)?;
    let records: Vec<RawCompanyRecord> = serde_json::from_str(&content)?;
    Ok(companies_from_records(&records, default_event))
}

pub fn companies_from_records(records: &[RawCompanyRecord], default_event: &str) -> SourceOutcome {
    let mut companies: Vec<Company> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match company_from_record(record, default_event) {
            Ok(company) => {
                if let Some(&pos) = positions.get(&company.id) {
                    debug!("Duplicate record for {}, keeping the later entry", company.id);
                    companies[pos] = company;
                } else {
                    positions.insert(company.id.clone(), companies.len());
                    companies.push(company);
                }
            }
            Err(e) => {
                warn!("Skipping record {}: {}", index, e);
                skipped.push(format!("record {index}: {e}"));
            }
        }
    }

    SourceOutcome { companies, skipped }
}

/// Write the processed company set into the output directory so a run's
/// intermediate state can be inspected or resumed from.
pub fn persist_companies(companies: &[Company], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("companies.json");
    let json = serde_json::to_string_pretty(companies)?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Storage boundary for companies and their stakeholders.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn upsert_company(&self, company: &Company) -> Result<()>;
    async fn get_company(&self, id: &str) -> Result<Option<Company>>;
    /// Companies ordered by id, so stage iteration is deterministic.
    async fn list_companies(&self) -> Result<Vec<Company>>;
    async fn replace_stakeholders(&self, company_id: &str, stakeholders: &[Stakeholder]) -> Result<()>;
    async fn stakeholders_for(&self, company_id: &str) -> Result<Vec<Stakeholder>>;
}

/// In-memory store used for single-run batches and tests.
pub struct InMemoryStore {
    companies: Arc<Mutex<BTreeMap<String, Company>>>,
    stakeholders: Arc<Mutex<BTreeMap<String, Vec<Stakeholder>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            companies: Arc::new(Mutex::new(BTreeMap::new())),
            stakeholders: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompanyStore for InMemoryStore {
    async fn upsert_company(&self, company: &Company) -> Result<()> {
        let mut companies = self.companies.lock().unwrap();
        companies.insert(company.id.clone(), company.clone());
        debug!("Stored company {} ({})", company.name, company.id);
        Ok(())
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        let companies = self.companies.lock().unwrap();
        Ok(companies.get(id).cloned())
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let companies = self.companies.lock().unwrap();
        Ok(companies.values().cloned().collect())
    }

    async fn replace_stakeholders(&self, company_id: &str, stakeholders: &[Stakeholder]) -> Result<()> {
        let mut by_company = self.stakeholders.lock().unwrap();
        by_company.insert(company_id.to_string(), stakeholders.to_vec());
        Ok(())
    }

    async fn stakeholders_for(&self, company_id: &str) -> Result<Vec<Stakeholder>> {
        let by_company = self.stakeholders.lock().unwrap();
        Ok(by_company.get(company_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> RawCompanyRecord {
        RawCompanyRecord {
            name: Some(name.to_string()),
            event: None,
            industry: None,
            description: Some("Large-format printing".to_string()),
            website: None,
            booth: None,
            employees: Some(120),
            engagement: Some(0.8),
            contacts: vec![RawContact {
                name: "Dana Reed".to_string(),
                title: "Director of Procurement".to_string(),
            }],
        }
    }

    #[test]
    fn company_ids_are_stable_and_event_scoped() {
        let a = derive_company_id("Acme Signs", "ISA Sign Expo 2025");
        let b = derive_company_id("Acme Signs", "ISA Sign Expo 2025");
        let c = derive_company_id("Acme Signs", "FESPA 2025");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("acme-signs-"));
    }

    #[test]
    fn record_without_name_is_malformed() {
        let mut r = record("Acme");
        r.name = Some("   ".to_string());
        let err = company_from_record(&r, "Expo").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord(_)));
    }

    #[test]
    fn feed_signals_are_seeded_into_attributes() {
        let company = company_from_record(&record("Acme"), "Expo").unwrap();
        assert_eq!(company.attribute_f64("engagement"), Some(0.8));
        let contacts = company.attribute("contacts").unwrap();
        assert_eq!(contacts[0]["title"], "Director of Procurement");
        assert_eq!(company.size, SizeBucket::Medium);
        assert_eq!(company.status, EnrichmentStatus::Pending);
    }

    #[test]
    fn duplicate_records_are_last_write_wins() {
        let mut first = record("Acme Signs");
        first.description = Some("old description".to_string());
        let mut second = record("Acme Signs");
        second.description = Some("new description".to_string());
        let malformed = RawCompanyRecord {
            name: None,
            event: None,
            industry: None,
            description: None,
            website: None,
            booth: None,
            employees: None,
            engagement: None,
            contacts: Vec::new(),
        };

        let outcome = companies_from_records(&[first, malformed, second], "Expo");
        assert_eq!(outcome.companies.len(), 1);
        assert_eq!(outcome.companies[0].description, "new description");
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].contains("record 1"));
    }

    #[test]
    fn persist_writes_company_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let company = company_from_record(&record("Acme"), "Expo").unwrap();
        let path = persist_companies(&[company], dir.path()).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"Acme\""));
    }

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryStore::new();
        let company = company_from_record(&record("Acme"), "Expo").unwrap();
        store.upsert_company(&company).await.unwrap();

        let loaded = store.get_company(&company.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Acme");
        assert_eq!(store.list_companies().await.unwrap().len(), 1);
        assert!(store.stakeholders_for(&company.id).await.unwrap().is_empty());
    }
}
