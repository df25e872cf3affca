// DepSleuth - core/adapters/telemetry.rs
//
// Distributed tracing spans. Only client spans name a peer service; spans
// without one are internal work and say nothing about dependencies.

use crate::core::adapter::SourceAdapter;
use crate::core::grammar::{builtin_catalog, GrammarSet};
use crate::core::model::{ParsedEvent, SourceType};
use crate::util::logging::preview;

#[derive(Debug, Clone)]
pub struct TelemetryAdapter {
    grammars: GrammarSet,
}

impl TelemetryAdapter {
    pub fn new(grammars: GrammarSet) -> Self {
        Self { grammars }
    }
}

impl Default for TelemetryAdapter {
    fn default() -> Self {
        Self::new(builtin_catalog().for_source(SourceType::Telemetry))
    }
}

impl SourceAdapter for TelemetryAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Telemetry
    }

    fn id_prefix(&self) -> &'static str {
        "telemetry"
    }

    fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }

    fn refine(&self, mut event: ParsedEvent) -> Option<ParsedEvent> {
        if event.downstream.is_none() {
            tracing::trace!(line = preview(&event.raw_line), "Internal span ignored");
            return None;
        }
        // OTLP spells status codes STATUS_CODE_OK / STATUS_CODE_ERROR.
        if let Some(status) = event.status.as_deref() {
            if let Some(short) = status.strip_prefix("STATUS_CODE_") {
                event.status = Some(short.to_string());
            }
        }
        Some(event)
    }
}
