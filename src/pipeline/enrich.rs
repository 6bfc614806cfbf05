use crate::config::EnrichmentConfig;
use crate::domain::{AttributeMap, Company};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tracing::{debug, instrument};

/// Outcome of one provider call. `Failure` degrades the company to
/// `EnrichmentFailed`; it never aborts the batch.
#[derive(Debug, Clone)]
pub enum EnrichmentResult {
    Success(AttributeMap),
    Failure(String),
}

/// Core trait every attribute provider implements. Providers may be static
/// lookups, heuristic inference, or external API calls; the pipeline only
/// depends on this contract.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Unique identifier for this provider
    fn provider_name(&self) -> &'static str;

    /// Produce attributes for one company, or a reason it could not.
    async fn enrich(&self, company: &Company) -> EnrichmentResult;
}

/// Construct the provider selected in config.
pub fn create_enricher(config: &EnrichmentConfig) -> Result<Box<dyn Enricher>> {
    match config.provider.as_str() {
        "heuristic" => Ok(Box::new(HeuristicEnricher::new())),
        "static" => {
            let path = config.attributes_file.as_deref().ok_or_else(|| {
                PipelineError::Config(
                    "enrichment.attributes_file is required for the static provider".to_string(),
                )
            })?;
            Ok(Box::new(StaticLookupEnricher::from_file(path)?))
        }
        "http" => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                PipelineError::Config(
                    "enrichment.endpoint is required for the http provider".to_string(),
                )
            })?;
            Ok(Box::new(HttpEnricher::new(
                endpoint,
                Duration::from_secs(config.timeout_seconds),
            )))
        }
        other => Err(PipelineError::Config(format!(
            "Unknown enrichment provider '{other}'"
        ))),
    }
}

/// Deterministic enricher that infers attributes from the company's own
/// text: materials, production technologies, and target markets mentioned
/// in the description.
pub struct HeuristicEnricher;

const MATERIAL_VOCABULARY: &[&str] = &[
    "vinyl",
    "acrylic",
    "aluminum",
    "pvc",
    "polycarbonate",
    "fabric",
    "foam board",
    "laminate",
    "glass",
];

const TECHNOLOGY_VOCABULARY: &[&str] = &[
    "digital printing",
    "uv printing",
    "screen printing",
    "vinyl cutting",
    "cnc routing",
    "laser cutting",
    "lamination",
    "thermoforming",
];

const MARKET_VOCABULARY: &[&str] = &["outdoor", "architectural", "transportation", "retail"];

impl HeuristicEnricher {
    pub fn new() -> Self {
        Self
    }

    fn matches_in(text: &str, vocabulary: &[&str]) -> Vec<String> {
        vocabulary
            .iter()
            .filter(|term| text.contains(*term))
            .map(|term| term.to_string())
            .collect()
    }
}

impl Default for HeuristicEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enricher for HeuristicEnricher {
    fn provider_name(&self) -> &'static str {
        "heuristic"
    }

    #[instrument(skip(self, company), fields(company_id = %company.id))]
    async fn enrich(&self, company: &Company) -> EnrichmentResult {
        let text = format!("{} {}", company.name, company.description).to_lowercase();

        let mut attributes = AttributeMap::new();
        let materials = Self::matches_in(&text, MATERIAL_VOCABULARY);
        if !materials.is_empty() {
            attributes.insert("materials".to_string(), serde_json::json!(materials));
        }
        let technologies = Self::matches_in(&text, TECHNOLOGY_VOCABULARY);
        if !technologies.is_empty() {
            attributes.insert("technologies".to_string(), serde_json::json!(technologies));
        }
        let markets = Self::matches_in(&text, MARKET_VOCABULARY);
        if !markets.is_empty() {
            attributes.insert("target_markets".to_string(), serde_json::json!(markets));
        }

        debug!("Inferred {} attributes for {}", attributes.len(), company.name);
        // No signal in the text is still a successful (empty) enrichment
        EnrichmentResult::Success(attributes)
    }
}

/// Provider backed by a pre-built attribute table, keyed by company id with
/// a lowercase-name fallback. Companies without an entry fail enrichment.
pub struct StaticLookupEnricher {
    table: HashMap<String, AttributeMap>,
}

impl StaticLookupEnricher {
    pub fn new(table: HashMap<String, AttributeMap>) -> Self {
        Self { table }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read attributes file '{path}': {e}"))
        })?;
        let table: HashMap<String, AttributeMap> = serde_json::from_str(&content)?;
        Ok(Self { table })
    }
}

#[async_trait]
impl Enricher for StaticLookupEnricher {
    fn provider_name(&self) -> &'static str {
        "static"
    }

    async fn enrich(&self, company: &Company) -> EnrichmentResult {
        let entry = self
            .table
            .get(&company.id)
            .or_else(|| self.table.get(&company.name.to_lowercase()));
        match entry {
            Some(attributes) => EnrichmentResult::Success(attributes.clone()),
            None => EnrichmentResult::Failure(format!("no attribute entry for '{}'", company.name)),
        }
    }
}

/// Provider that calls an external enrichment endpoint. The timeout is this
/// adapter's responsibility; it surfaces as a `Failure`, never as a
/// pipeline error.
pub struct HttpEnricher {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpEnricher {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            timeout,
        }
    }

    async fn call(&self, company: &Company) -> Result<AttributeMap> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(company)
            .send()
            .await?
            .error_for_status()?;
        let attributes: AttributeMap = response.json().await?;
        Ok(attributes)
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    fn provider_name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, company), fields(company_id = %company.id))]
    async fn enrich(&self, company: &Company) -> EnrichmentResult {
        match tokio::time::timeout(self.timeout, self.call(company)).await {
            Ok(Ok(attributes)) => EnrichmentResult::Success(attributes),
            Ok(Err(e)) => EnrichmentResult::Failure(format!("provider call failed: {e}")),
            Err(_) => EnrichmentResult::Failure(format!(
                "provider timed out after {}s",
                self.timeout.as_secs()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{company_from_record, RawCompanyRecord};

    fn company(description: &str) -> Company {
        let record = RawCompanyRecord {
            name: Some("Acme Signs".to_string()),
            event: None,
            industry: None,
            description: Some(description.to_string()),
            website: None,
            booth: None,
            employees: None,
            engagement: None,
            contacts: Vec::new(),
        };
        company_from_record(&record, "Expo").unwrap()
    }

    #[tokio::test]
    async fn heuristic_infers_materials_and_technologies() {
        let enricher = HeuristicEnricher::new();
        let company = company("Vinyl and PVC wraps finished with UV printing for outdoor displays");

        match enricher.enrich(&company).await {
            EnrichmentResult::Success(attributes) => {
                let materials = attributes.get("materials").unwrap();
                assert!(materials.as_array().unwrap().iter().any(|m| m == "vinyl"));
                assert!(materials.as_array().unwrap().iter().any(|m| m == "pvc"));
                let technologies = attributes.get("technologies").unwrap();
                assert!(technologies.as_array().unwrap().iter().any(|t| t == "uv printing"));
                let markets = attributes.get("target_markets").unwrap();
                assert!(markets.as_array().unwrap().iter().any(|m| m == "outdoor"));
            }
            EnrichmentResult::Failure(reason) => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn heuristic_with_no_signal_is_empty_success() {
        let enricher = HeuristicEnricher::new();
        let company = company("We make sandwiches");

        match enricher.enrich(&company).await {
            EnrichmentResult::Success(attributes) => assert!(attributes.is_empty()),
            EnrichmentResult::Failure(reason) => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn static_lookup_fails_for_unknown_company() {
        let enricher = StaticLookupEnricher::new(HashMap::new());
        let company = company("anything");

        match enricher.enrich(&company).await {
            EnrichmentResult::Failure(reason) => assert!(reason.contains("Acme Signs")),
            EnrichmentResult::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn static_lookup_matches_by_id() {
        let company = company("anything");
        let mut table = HashMap::new();
        let mut attributes = AttributeMap::new();
        attributes.insert("materials".to_string(), serde_json::json!(["vinyl"]));
        table.insert(company.id.clone(), attributes);

        let enricher = StaticLookupEnricher::new(table);
        match enricher.enrich(&company).await {
            EnrichmentResult::Success(attributes) => {
                assert!(attributes.contains_key("materials"));
            }
            EnrichmentResult::Failure(reason) => panic!("unexpected failure: {reason}"),
        }
    }

    #[test]
    fn factory_rejects_unknown_provider() {
        let config = EnrichmentConfig {
            provider: "oracle".to_string(),
            ..EnrichmentConfig::default()
        };
        assert!(matches!(
            create_enricher(&config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn factory_requires_endpoint_for_http() {
        let config = EnrichmentConfig {
            provider: "http".to_string(),
            ..EnrichmentConfig::default()
        };
        assert!(matches!(
            create_enricher(&config),
            Err(PipelineError::Config(_))
        ));
    }
}
