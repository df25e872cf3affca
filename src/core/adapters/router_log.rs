// DepSleuth - core/adapters/router_log.rs
//
// Router and reverse-proxy access logs (HAProxy, nginx, Envoy, generic).

use crate::core::adapter::SourceAdapter;
use crate::core::grammar::{builtin_catalog, GrammarSet};
use crate::core::model::SourceType;

/// Claims from router logs. Every recognised request line is one observed
/// call from the fronting application to the routed backend.
#[derive(Debug, Clone)]
pub struct RouterLogAdapter {
    grammars: GrammarSet,
}

impl RouterLogAdapter {
    pub fn new(grammars: GrammarSet) -> Self {
        Self { grammars }
    }
}

impl Default for RouterLogAdapter {
    fn default() -> Self {
        Self::new(builtin_catalog().for_source(SourceType::RouterLog))
    }
}

impl SourceAdapter for RouterLogAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::RouterLog
    }

    fn id_prefix(&self) -> &'static str {
        "router"
    }

    fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }
}
