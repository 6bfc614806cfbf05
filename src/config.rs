use crate::domain::Seniority;
use crate::error::{PipelineError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;

/// Top-level configuration. Everything with decision weight lives here so a
/// scoring run can be retuned without code changes.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub rubric: RubricConfig,
    #[serde(default)]
    pub roles: RolesConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{path}': {e}"))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            enrichment: EnrichmentConfig::default(),
            rubric: RubricConfig::default(),
            roles: RolesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

/// Which enrichment provider the orchestrator should construct.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// One of "heuristic", "static", "http".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Endpoint for the "http" provider.
    pub endpoint: Option<String>,
    /// Per-call timeout for the "http" provider.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Attribute table for the "static" provider, JSON keyed by company id.
    pub attributes_file: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            timeout_seconds: default_timeout_seconds(),
            attributes_file: None,
        }
    }
}

fn default_provider() -> String {
    "heuristic".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Declarative rubric: tier thresholds plus the weighted criteria list.
/// Validation (weights summing to 1.0, threshold ordering) happens at
/// `Rubric` construction, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricConfig {
    #[serde(default = "default_tier_a")]
    pub tier_a: u32,
    #[serde(default = "default_tier_b")]
    pub tier_b: u32,
    #[serde(default = "default_tier_c")]
    pub tier_c: u32,
    #[serde(default)]
    pub criteria: Vec<CriterionConfig>,
}

fn default_tier_a() -> u32 {
    80
}

fn default_tier_b() -> u32 {
    60
}

fn default_tier_c() -> u32 {
    40
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            tier_a: default_tier_a(),
            tier_b: default_tier_b(),
            tier_c: default_tier_c(),
            criteria: vec![
                CriterionConfig {
                    name: "industry_relevance".to_string(),
                    weight: 0.5,
                    kind: CriterionKind::KeywordOverlap {
                        attribute: None,
                        keywords: DEFAULT_INDUSTRY_KEYWORDS
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                        points_per_match: 20.0,
                    },
                },
                CriterionConfig {
                    name: "company_size".to_string(),
                    weight: 0.3,
                    kind: CriterionKind::SizeBucketScore {
                        scores: SizeScores::default(),
                    },
                },
                CriterionConfig {
                    name: "event_engagement".to_string(),
                    weight: 0.2,
                    kind: CriterionKind::NumericAttribute {
                        attribute: "engagement".to_string(),
                        scale: 100.0,
                    },
                },
            ],
        }
    }
}

/// One weighted scoring criterion as declared in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionConfig {
    pub name: String,
    pub weight: f64,
    #[serde(flatten)]
    pub kind: CriterionKind,
}

/// Evaluation strategy for a criterion. The scoring engine maps each kind
/// to a sub-score in [0, 100]; a missing attribute evaluates to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriterionKind {
    /// Count configured keywords present in the company's text. By default
    /// the description plus the "materials"/"technologies"/"products"
    /// attributes are searched; `attribute` narrows it to one attribute.
    KeywordOverlap {
        #[serde(default)]
        attribute: Option<String>,
        keywords: Vec<String>,
        #[serde(default = "default_points_per_match")]
        points_per_match: f64,
    },
    /// Fixed sub-score per estimated size bucket.
    SizeBucketScore {
        #[serde(default)]
        scores: SizeScores,
    },
    /// Read a numeric attribute and scale it into [0, 100].
    NumericAttribute {
        attribute: String,
        #[serde(default = "default_numeric_scale")]
        scale: f64,
    },
}

fn default_points_per_match() -> f64 {
    20.0
}

fn default_numeric_scale() -> f64 {
    100.0
}

/// Per-bucket sub-scores for the size criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeScores {
    pub micro: f64,
    pub small: f64,
    pub medium: f64,
    pub large: f64,
    pub enterprise: f64,
    pub unknown: f64,
}

impl Default for SizeScores {
    fn default() -> Self {
        Self {
            micro: 10.0,
            small: 40.0,
            medium: 70.0,
            large: 90.0,
            enterprise: 100.0,
            unknown: 0.0,
        }
    }
}

/// Target-role keywords and seniority ranks for stakeholder resolution.
/// List order matters: earlier entries win ties.
#[derive(Debug, Clone, Deserialize)]
pub struct RolesConfig {
    #[serde(default = "default_role_targets")]
    pub targets: Vec<RoleTarget>,
    #[serde(default = "default_seniority_ranks")]
    pub seniority: Vec<SeniorityRank>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            targets: default_role_targets(),
            seniority: default_seniority_ranks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleTarget {
    pub keyword: String,
    pub function: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeniorityRank {
    pub tier: Seniority,
    pub keywords: Vec<String>,
}

static DEFAULT_INDUSTRY_KEYWORDS: &[&str] = &[
    "signage",
    "graphics",
    "large-format printing",
    "vehicle wraps",
    "architectural graphics",
    "protective films",
    "outdoor displays",
    "digital printing",
    "visual communications",
];

static DEFAULT_ROLE_TARGETS: Lazy<Vec<RoleTarget>> = Lazy::new(|| {
    [
        ("procurement", "procurement"),
        ("purchasing", "procurement"),
        ("materials", "procurement"),
        ("product", "product_development"),
        ("innovation", "r_and_d"),
        ("r&d", "r_and_d"),
        ("technology", "r_and_d"),
        ("marketing", "marketing"),
    ]
    .iter()
    .map(|(keyword, function)| RoleTarget {
        keyword: keyword.to_string(),
        function: function.to_string(),
    })
    .collect()
});

static DEFAULT_SENIORITY_RANKS: Lazy<Vec<SeniorityRank>> = Lazy::new(|| {
    vec![
        SeniorityRank {
            tier: Seniority::Executive,
            keywords: ["chief", "cto", "ceo", "vp", "vice president", "president", "head of"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
        SeniorityRank {
            tier: Seniority::Director,
            keywords: vec!["director".to_string()],
        },
        SeniorityRank {
            tier: Seniority::Manager,
            keywords: vec!["manager".to_string(), "lead".to_string()],
        },
        SeniorityRank {
            tier: Seniority::Specialist,
            keywords: ["specialist", "engineer", "analyst", "coordinator"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
    ]
});

fn default_role_targets() -> Vec<RoleTarget> {
    DEFAULT_ROLE_TARGETS.clone()
}

fn default_seniority_ranks() -> Vec<SeniorityRank> {
    DEFAULT_SENIORITY_RANKS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config_from_toml() {
        let toml_src = r#"
            [pipeline]
            output_dir = "out"

            [enrichment]
            provider = "http"
            endpoint = "http://localhost:9000/enrich"
            timeout_seconds = 3

            [rubric]
            tier_a = 85
            tier_b = 65
            tier_c = 45

            [[rubric.criteria]]
            name = "relevance"
            weight = 0.6
            kind = "keyword_overlap"
            keywords = ["signage", "graphics"]

            [[rubric.criteria]]
            name = "size"
            weight = 0.4
            kind = "size_bucket_score"

            [[roles.targets]]
            keyword = "procurement"
            function = "procurement"

            [[roles.seniority]]
            tier = "executive"
            keywords = ["vp"]
        "#;

        let config: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.pipeline.output_dir, "out");
        assert_eq!(config.enrichment.provider, "http");
        assert_eq!(config.enrichment.timeout_seconds, 3);
        assert_eq!(config.rubric.tier_a, 85);
        assert_eq!(config.rubric.criteria.len(), 2);
        assert_eq!(config.roles.targets.len(), 1);
        assert_eq!(config.roles.seniority[0].tier, Seniority::Executive);
    }

    #[test]
    fn defaults_cover_missing_sections() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.pipeline.output_dir, "output");
        assert_eq!(config.enrichment.provider, "heuristic");
        assert_eq!(config.rubric.tier_a, 80);
        assert_eq!(config.rubric.criteria.len(), 3);
        assert!(!config.roles.targets.is_empty());
    }
}
