// DepSleuth - app/pipeline.rs
//
// End-to-end run: evidence batches -> adapters (in parallel, one task per
// batch) -> processing -> resolution. Fan-in happens only at resolution.

use crate::app::ingest::{EvidenceBatch, Ingested};
use crate::core::adapters::AdapterRegistry;
use crate::core::grammar::GrammarCatalog;
use crate::core::model::{Claim, ClaimDraft, SourceType};
use crate::core::processing::ClaimProcessingEngine;
use crate::core::resolution::ConflictResolutionEngine;
use crate::platform::config::AppConfig;
use crate::util::error::ClaimError;
use rayon::prelude::*;

/// Counters describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Evidence files handed to the adapters.
    pub evidence_files: usize,
    /// Claims produced by the adapters.
    pub parsed_claims: usize,
    /// Claims loaded pre-built from claim files.
    pub external_claims: usize,
    /// Claims after validation and scoring.
    pub processed_claims: usize,
    /// Canonical claims, one per edge.
    pub edges: usize,
    /// Edges that had competing claims and were fused.
    pub fused_edges: usize,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub claims: Vec<Claim>,
    pub summary: PipelineSummary,
}

pub struct Pipeline {
    registry: AdapterRegistry,
    processing: ClaimProcessingEngine,
    resolution: ConflictResolutionEngine,
}

impl Pipeline {
    pub fn new(
        registry: AdapterRegistry,
        processing: ClaimProcessingEngine,
        resolution: ConflictResolutionEngine,
    ) -> Self {
        Self {
            registry,
            processing,
            resolution,
        }
    }

    /// Build a pipeline from loaded configuration and a grammar catalog.
    pub fn from_config(config: &AppConfig, catalog: &GrammarCatalog) -> Self {
        Self::new(
            AdapterRegistry::from_catalog(catalog),
            ClaimProcessingEngine::new(config.scoring.clone()),
            ConflictResolutionEngine::new(config.fusion.clone()),
        )
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Parse every batch with its source's adapter. Batches run in parallel;
    /// the output keeps batch order.
    pub fn parse_batches(&self, batches: &[EvidenceBatch], format: Option<&str>) -> Vec<Claim> {
        batches
            .par_iter()
            .map(|batch| self.parse_batch(batch, format))
            .collect::<Vec<Vec<Claim>>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn parse_batch(&self, batch: &EvidenceBatch, format: Option<&str>) -> Vec<Claim> {
        match self.registry.get(batch.source) {
            Some(adapter) => {
                let claims = adapter.parse(&batch.text, format);
                tracing::debug!(
                    file = %batch.path.display(),
                    source = %batch.source,
                    claims = claims.len(),
                    "Batch parsed"
                );
                claims
            }
            None => {
                tracing::warn!(
                    file = %batch.path.display(),
                    source = %batch.source,
                    "No adapter for source type, batch ignored"
                );
                Vec::new()
            }
        }
    }

    /// Run the whole pipeline.
    ///
    /// # Errors
    /// Any invalid claim (from an adapter or a claim file) rejects the run.
    pub fn run(&self, ingested: &Ingested, format: Option<&str>) -> Result<PipelineOutput, ClaimError> {
        let parsed = self.parse_batches(&ingested.batches, format);
        let parsed_claims = parsed.len();
        let external_claims = ingested.drafts.len();

        let drafts = parsed
            .into_iter()
            .map(ClaimDraft::from)
            .chain(ingested.drafts.iter().cloned());
        let processed = self.processing.process_claims(drafts)?;
        let processed_claims = processed.len();

        let claims = self.resolution.resolve_claims(processed);
        let fused_edges = claims
            .iter()
            .filter(|c| c.source_type() == SourceType::ConflictResolved)
            .count();

        let summary = PipelineSummary {
            evidence_files: ingested.batches.len(),
            parsed_claims,
            external_claims,
            processed_claims,
            edges: claims.len(),
            fused_edges,
        };

        tracing::info!(
            files = summary.evidence_files,
            parsed = summary.parsed_claims,
            external = summary.external_claims,
            edges = summary.edges,
            fused = summary.fused_edges,
            "Pipeline complete"
        );

        Ok(PipelineOutput { claims, summary })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(
            AdapterRegistry::default(),
            ClaimProcessingEngine::default(),
            ConflictResolutionEngine::default(),
        )
    }
}
