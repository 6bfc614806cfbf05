use crate::domain::{EnrichmentStatus, ScoredLead};
use crate::error::Result;
use crate::pipeline::enrich::{Enricher, EnrichmentResult};
use crate::pipeline::resolve::StakeholderResolver;
use crate::pipeline::scoring::Rubric;
use crate::report;
use crate::store::{self, CompanyStore};
use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Counters and outcomes for one pipeline run. Passed back to the caller
/// instead of living in process-wide state, so concurrent runs (and tests)
/// stay independent.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub companies_sourced: usize,
    pub skipped_records: Vec<String>,
    pub enriched: usize,
    pub enrichment_failed: usize,
    pub stakeholders_found: usize,
    pub leads_emitted: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
    pub output_file: Option<String>,
}

/// Sequences the pipeline stages over the full company set, one stage at a
/// time: Source -> Enrich -> Resolve -> Score -> Emit. Each stage applies
/// its failure policy to every record before the next stage begins, so
/// intermediate state is inspectable and a per-record failure degrades only
/// that record.
pub struct LeadPipeline {
    store: Arc<dyn CompanyStore>,
    enricher: Box<dyn Enricher>,
    resolver: StakeholderResolver,
    rubric: Rubric,
    cancel: Arc<AtomicBool>,
}

impl LeadPipeline {
    pub fn new(
        store: Arc<dyn CompanyStore>,
        enricher: Box<dyn Enricher>,
        resolver: StakeholderResolver,
        rubric: Rubric,
    ) -> Self {
        Self {
            store,
            enricher,
            resolver,
            rubric,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for aborting the run. The abort takes effect after the
    /// current stage completes; no partial-stage output is ever emitted.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn cancelled(&self, summary: &mut RunSummary, after_stage: &str) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            warn!("Run cancelled after {} stage", after_stage);
            summary.cancelled = true;
            return true;
        }
        false
    }

    /// Run the full pipeline over one raw feed. Configuration-level
    /// problems (unreadable feed, invalid JSON) abort with an error;
    /// per-record problems are counted and the run continues.
    #[instrument(skip(self, input, output_dir), fields(provider = %self.enricher.provider_name()))]
    pub async fn run(
        &self,
        input: &Path,
        default_event: &str,
        output_dir: &Path,
    ) -> Result<RunSummary> {
        counter!("leadflow_runs_total").increment(1);
        let mut summary = RunSummary::default();

        // Stage 1: source
        let t_stage = std::time::Instant::now();
        info!("Sourcing companies from {}", input.display());
        let outcome = store::load_companies(input, default_event)?;
        summary.companies_sourced = outcome.companies.len();
        summary.skipped_records = outcome.skipped;
        for company in &outcome.companies {
            self.store.upsert_company(company).await?;
        }
        store::persist_companies(&outcome.companies, output_dir)?;
        counter!("leadflow_companies_sourced_total").increment(summary.companies_sourced as u64);
        counter!("leadflow_records_skipped_total").increment(summary.skipped_records.len() as u64);
        histogram!("leadflow_stage_duration_seconds", "stage" => "source")
            .record(t_stage.elapsed().as_secs_f64());
        info!(
            "Sourced {} companies ({} records skipped)",
            summary.companies_sourced,
            summary.skipped_records.len()
        );
        if self.cancelled(&mut summary, "source") {
            return Ok(summary);
        }

        // Stage 2: enrich
        let t_stage = std::time::Instant::now();
        for mut company in self.store.list_companies().await? {
            match self.enricher.enrich(&company).await {
                EnrichmentResult::Success(attributes) => {
                    company.attributes.extend(attributes);
                    company.status = EnrichmentStatus::Enriched;
                    company.enriched_at = Some(Utc::now());
                    summary.enriched += 1;
                }
                EnrichmentResult::Failure(reason) => {
                    warn!("Enrichment failed for {}: {}", company.name, reason);
                    company.status = EnrichmentStatus::EnrichmentFailed;
                    summary.enrichment_failed += 1;
                    summary
                        .errors
                        .push(format!("enrichment of '{}': {reason}", company.name));
                }
            }
            self.store.upsert_company(&company).await?;
        }
        store::persist_companies(&self.store.list_companies().await?, output_dir)?;
        counter!("leadflow_companies_enriched_total").increment(summary.enriched as u64);
        counter!("leadflow_enrichment_failures_total").increment(summary.enrichment_failed as u64);
        histogram!("leadflow_stage_duration_seconds", "stage" => "enrich")
            .record(t_stage.elapsed().as_secs_f64());
        info!(
            "Enriched {} companies ({} failures)",
            summary.enriched, summary.enrichment_failed
        );
        if self.cancelled(&mut summary, "enrich") {
            return Ok(summary);
        }

        // Stage 3: resolve stakeholders
        let t_stage = std::time::Instant::now();
        for company in self.store.list_companies().await? {
            if company.status != EnrichmentStatus::Enriched {
                continue;
            }
            let stakeholders = self.resolver.resolve(&company);
            summary.stakeholders_found += stakeholders.len();
            self.store
                .replace_stakeholders(&company.id, &stakeholders)
                .await?;
        }
        counter!("leadflow_stakeholders_total").increment(summary.stakeholders_found as u64);
        histogram!("leadflow_stage_duration_seconds", "stage" => "resolve")
            .record(t_stage.elapsed().as_secs_f64());
        info!("Resolved {} stakeholders", summary.stakeholders_found);
        if self.cancelled(&mut summary, "resolve") {
            return Ok(summary);
        }

        // Stage 4: score
        let t_stage = std::time::Instant::now();
        let mut leads = Vec::new();
        for company in self.store.list_companies().await? {
            let score = self.rubric.score(&company);
            let stakeholders = self.store.stakeholders_for(&company.id).await?;
            leads.push(ScoredLead {
                company,
                stakeholders,
                score,
            });
        }
        histogram!("leadflow_stage_duration_seconds", "stage" => "score")
            .record(t_stage.elapsed().as_secs_f64());
        info!("Scored {} leads", leads.len());
        if self.cancelled(&mut summary, "score") {
            return Ok(summary);
        }

        // Stage 5: emit, highest score first, ties by company id
        let t_stage = std::time::Instant::now();
        leads.sort_by(|a, b| {
            b.score
                .total
                .cmp(&a.score.total)
                .then_with(|| a.company.id.cmp(&b.company.id))
        });
        let output_file = report::write_leads(&leads, output_dir)?;
        summary.leads_emitted = leads.len();
        summary.output_file = Some(output_file.to_string_lossy().to_string());
        counter!("leadflow_leads_emitted_total").increment(leads.len() as u64);
        histogram!("leadflow_stage_duration_seconds", "stage" => "emit")
            .record(t_stage.elapsed().as_secs_f64());
        info!("Emitted {} leads to {}", leads.len(), output_file.display());

        Ok(summary)
    }
}
