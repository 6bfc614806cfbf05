use crate::config::{CriterionKind, RubricConfig, SizeScores};
use crate::domain::{
    Company, CriterionContribution, EnrichmentStatus, LeadScore, SizeBucket, Tier,
};
use crate::error::{PipelineError, Result};

/// Allowed deviation of the criterion weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One weighted criterion: a name, a weight in [0, 1], and an evaluation
/// strategy mapping a company to a sub-score in [0, 100].
#[derive(Debug, Clone)]
pub struct ScoreCriterion {
    pub name: String,
    pub weight: f64,
    kind: CriterionKind,
}

impl ScoreCriterion {
    pub fn new(name: &str, weight: f64, kind: CriterionKind) -> Self {
        Self {
            name: name.to_string(),
            weight,
            kind,
        }
    }

    /// Sub-score in [0, 100] from the company's enriched attributes. A
    /// missing attribute evaluates to 0, never to an error.
    fn evaluate(&self, company: &Company) -> f64 {
        match &self.kind {
            CriterionKind::KeywordOverlap {
                attribute,
                keywords,
                points_per_match,
            } => {
                let text = match attribute {
                    Some(name) => attribute_text(company, name),
                    None => default_search_text(company),
                };
                if text.is_empty() {
                    return 0.0;
                }
                let hits = keywords
                    .iter()
                    .filter(|k| text.contains(&k.to_lowercase()))
                    .count();
                (hits as f64 * points_per_match).clamp(0.0, 100.0)
            }
            CriterionKind::SizeBucketScore { scores } => size_score(company.size, scores),
            CriterionKind::NumericAttribute { attribute, scale } => company
                .attribute_f64(attribute)
                .map(|v| (v * scale).clamp(0.0, 100.0))
                .unwrap_or(0.0),
        }
    }
}

fn size_score(size: SizeBucket, scores: &SizeScores) -> f64 {
    match size {
        SizeBucket::Micro => scores.micro,
        SizeBucket::Small => scores.small,
        SizeBucket::Medium => scores.medium,
        SizeBucket::Large => scores.large,
        SizeBucket::Enterprise => scores.enterprise,
        SizeBucket::Unknown => scores.unknown,
    }
    .clamp(0.0, 100.0)
}

/// Lowercased text of one named attribute (string or array of strings).
fn attribute_text(company: &Company, name: &str) -> String {
    match company.attribute(name) {
        Some(serde_json::Value::String(s)) => s.to_lowercase(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
        _ => String::new(),
    }
}

/// Default search surface: description plus the text-bearing enriched
/// attributes.
fn default_search_text(company: &Company) -> String {
    let mut text = company.description.to_lowercase();
    for attr in ["products", "materials", "technologies", "target_markets"] {
        let extra = attribute_text(company, attr);
        if !extra.is_empty() {
            text.push(' ');
            text.push_str(&extra);
        }
    }
    text
}

/// Score thresholds for tier assignment, inclusive lower bounds.
#[derive(Debug, Clone, Copy)]
pub struct TierThresholds {
    pub tier_a: u32,
    pub tier_b: u32,
    pub tier_c: u32,
}

impl TierThresholds {
    pub fn tier_for(&self, total: u32) -> Tier {
        if total >= self.tier_a {
            Tier::A
        } else if total >= self.tier_b {
            Tier::B
        } else if total >= self.tier_c {
            Tier::C
        } else {
            Tier::Unqualified
        }
    }
}

/// A validated scoring rubric. Construction fails fast on a bad
/// configuration so a misconfigured rubric can never produce scores.
#[derive(Debug, Clone)]
pub struct Rubric {
    criteria: Vec<ScoreCriterion>,
    thresholds: TierThresholds,
}

impl Rubric {
    pub fn new(criteria: Vec<ScoreCriterion>, thresholds: TierThresholds) -> Result<Self> {
        if criteria.is_empty() {
            return Err(PipelineError::InvalidRubric(
                "rubric declares no criteria".to_string(),
            ));
        }
        for criterion in &criteria {
            if !(0.0..=1.0).contains(&criterion.weight) {
                return Err(PipelineError::InvalidRubric(format!(
                    "criterion '{}' has weight {} outside [0, 1]",
                    criterion.name, criterion.weight
                )));
            }
        }
        let weight_sum: f64 = criteria.iter().map(|c| c.weight).sum();
        if (weight_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PipelineError::InvalidRubric(format!(
                "criterion weights sum to {weight_sum}, expected 1.0"
            )));
        }
        if thresholds.tier_a < thresholds.tier_b
            || thresholds.tier_b < thresholds.tier_c
            || thresholds.tier_c < 1
            || thresholds.tier_a > 100
        {
            return Err(PipelineError::InvalidRubric(format!(
                "tier thresholds must satisfy 100 >= A >= B >= C >= 1, got A={} B={} C={}",
                thresholds.tier_a, thresholds.tier_b, thresholds.tier_c
            )));
        }
        Ok(Self {
            criteria,
            thresholds,
        })
    }

    pub fn from_config(config: &RubricConfig) -> Result<Self> {
        let criteria = config
            .criteria
            .iter()
            .map(|c| ScoreCriterion::new(&c.name, c.weight, c.kind.clone()))
            .collect();
        Self::new(
            criteria,
            TierThresholds {
                tier_a: config.tier_a,
                tier_b: config.tier_b,
                tier_c: config.tier_c,
            },
        )
    }

    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }

    /// Deterministic, side-effect-free scoring. The breakdown lists every
    /// criterion in declaration order whatever the sub-scores, so the total
    /// can always be reconstructed from it. A company whose enrichment
    /// failed scores 0 everywhere and is tiered `Unqualified`.
    pub fn score(&self, company: &Company) -> LeadScore {
        let failed = company.status == EnrichmentStatus::EnrichmentFailed;

        let breakdown: Vec<CriterionContribution> = self
            .criteria
            .iter()
            .map(|criterion| {
                let sub_score = if failed { 0.0 } else { criterion.evaluate(company) };
                CriterionContribution {
                    criterion: criterion.name.clone(),
                    sub_score,
                    weight: criterion.weight,
                    contribution: sub_score * criterion.weight,
                }
            })
            .collect();

        let weighted_sum: f64 = breakdown.iter().map(|c| c.contribution).sum();
        // round() is round-half-up for non-negative values
        let total = weighted_sum.clamp(0.0, 100.0).round() as u32;

        let tier = if failed {
            Tier::Unqualified
        } else {
            self.thresholds.tier_for(total)
        };

        LeadScore {
            company_id: company.id.clone(),
            total,
            tier,
            breakdown,
        }
    }
}
