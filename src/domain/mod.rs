use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Attribute bag produced by enrichment. BTreeMap keeps serialization
/// order stable across runs.
pub type AttributeMap = BTreeMap<String, serde_json::Value>;

/// Enrichment lifecycle of a company record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrichmentStatus {
    Pending,
    Enriched,
    EnrichmentFailed,
}

/// Estimated company size, bucketed from an employee count when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    Micro,
    Small,
    Medium,
    Large,
    Enterprise,
    Unknown,
}

impl SizeBucket {
    pub fn from_employees(employees: Option<u32>) -> Self {
        match employees {
            None => SizeBucket::Unknown,
            Some(n) if n < 10 => SizeBucket::Micro,
            Some(n) if n < 50 => SizeBucket::Small,
            Some(n) if n < 250 => SizeBucket::Medium,
            Some(n) if n < 1000 => SizeBucket::Large,
            Some(_) => SizeBucket::Enterprise,
        }
    }
}

/// A company sourced from an event exhibitor feed.
///
/// The identifier is derived from name + event at sourcing and never changes
/// for the lifetime of a pipeline run. Only the enrichment stage mutates the
/// record (status, attributes, enriched_at).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub industry: Option<String>,
    pub size: SizeBucket,
    pub description: String,
    pub website: Option<String>,
    pub source_event: String,
    pub booth: Option<String>,
    pub status: EnrichmentStatus,
    pub attributes: AttributeMap,
    pub sourced_at: DateTime<Utc>,
    pub enriched_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Numeric attribute lookup; ints and floats both count.
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(|v| v.as_f64())
    }
}

/// Inferred seniority of a stakeholder, most senior first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Executive,
    Director,
    Manager,
    Specialist,
    Unknown,
}

impl Seniority {
    /// Rank for ordering: lower is more senior.
    pub fn rank(&self) -> u8 {
        match self {
            Seniority::Executive => 0,
            Seniority::Director => 1,
            Seniority::Manager => 2,
            Seniority::Specialist => 3,
            Seniority::Unknown => 4,
        }
    }
}

/// A candidate decision-maker attached to exactly one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: Uuid,
    pub company_id: String,
    pub name: String,
    pub title: String,
    pub seniority: Seniority,
    pub function: String,
}

/// Qualification bucket derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
    Unqualified,
}

/// One rubric criterion's contribution to a lead score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionContribution {
    pub criterion: String,
    pub sub_score: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// Immutable scoring result for one company. Recomputing with the same
/// rubric and company produces an equal value; there is no in-place edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub company_id: String,
    pub total: u32,
    pub tier: Tier,
    pub breakdown: Vec<CriterionContribution>,
}

/// The unit handed to the output sink: a company, its stakeholders, and
/// its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLead {
    pub company: Company,
    pub stakeholders: Vec<Stakeholder>,
    pub score: LeadScore,
}
