// DepSleuth - core/adapters/network.rs
//
// Network-level evidence: flow logs, firewall logs and conntrack dumps
// whose endpoints have been resolved to application names.

use crate::core::adapter::SourceAdapter;
use crate::core::grammar::{builtin_catalog, GrammarSet};
use crate::core::model::{ParsedEvent, SourceType};

#[derive(Debug, Clone)]
pub struct NetworkAdapter {
    grammars: GrammarSet,
}

impl NetworkAdapter {
    pub fn new(grammars: GrammarSet) -> Self {
        Self { grammars }
    }
}

impl Default for NetworkAdapter {
    fn default() -> Self {
        Self::new(builtin_catalog().for_source(SourceType::Network))
    }
}

impl SourceAdapter for NetworkAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Network
    }

    fn id_prefix(&self) -> &'static str {
        "network"
    }

    fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }

    /// Traffic from an application to itself (health checks, loopback) is
    /// not a dependency.
    fn refine(&self, event: ParsedEvent) -> Option<ParsedEvent> {
        let same = event
            .downstream
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case(event.upstream.trim()));
        (!same).then_some(event)
    }
}
