// DepSleuth - core/adapters/ci_cd.rs
//
// CI/CD pipeline logs: jobs and workflows in one project triggering work in
// another are evidence that the two are deployed together.

use crate::core::adapter::SourceAdapter;
use crate::core::grammar::{builtin_catalog, GrammarSet};
use crate::core::model::{ParsedEvent, SourceType};

#[derive(Debug, Clone)]
pub struct CiCdAdapter {
    grammars: GrammarSet,
}

impl CiCdAdapter {
    pub fn new(grammars: GrammarSet) -> Self {
        Self { grammars }
    }
}

impl Default for CiCdAdapter {
    fn default() -> Self {
        Self::new(builtin_catalog().for_source(SourceType::CiCd))
    }
}

impl SourceAdapter for CiCdAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::CiCd
    }

    fn id_prefix(&self) -> &'static str {
        "cicd"
    }

    fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }

    /// A trigger without an explicit step name is recorded under its platform.
    fn refine(&self, mut event: ParsedEvent) -> Option<ParsedEvent> {
        if event.action.is_none() {
            event.action = Some(event.platform.clone());
        }
        Some(event)
    }
}
