// DepSleuth - core/adapters/mod.rs
//
// One adapter per evidence origin, plus the registry that maps a source type
// to its adapter.

pub mod api_gateway;
pub mod ci_cd;
pub mod codebase;
pub mod network;
pub mod router_log;
pub mod telemetry;

pub use api_gateway::ApiGatewayAdapter;
pub use ci_cd::CiCdAdapter;
pub use codebase::CodebaseAdapter;
pub use network::NetworkAdapter;
pub use router_log::RouterLogAdapter;
pub use telemetry::TelemetryAdapter;

use crate::core::adapter::SourceAdapter;
use crate::core::grammar::{builtin_catalog, GrammarCatalog};
use crate::core::model::SourceType;

/// All adapters, built over one grammar catalog.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Build every adapter with its share of `catalog`.
    pub fn from_catalog(catalog: &GrammarCatalog) -> Self {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(CodebaseAdapter::new(catalog.for_source(SourceType::Codebase))),
            Box::new(RouterLogAdapter::new(catalog.for_source(SourceType::RouterLog))),
            Box::new(ApiGatewayAdapter::new(catalog.for_source(SourceType::ApiGateway))),
            Box::new(CiCdAdapter::new(catalog.for_source(SourceType::CiCd))),
            Box::new(TelemetryAdapter::new(catalog.for_source(SourceType::Telemetry))),
            Box::new(NetworkAdapter::new(catalog.for_source(SourceType::Network))),
        ];
        Self { adapters }
    }

    /// Adapter for an evidence source. `None` for `CONFLICT_RESOLVED`.
    pub fn get(&self, source: SourceType) -> Option<&dyn SourceAdapter> {
        self.adapters
            .iter()
            .find(|a| a.source_type() == source)
            .map(|a| &**a)
    }

    /// Source type owning the grammar `format`, if any.
    pub fn source_for_format(&self, format: &str) -> Option<SourceType> {
        self.adapters
            .iter()
            .find(|a| a.grammars().get(format).is_some())
            .map(|a| a.source_type())
    }

    /// Every known format tag, grouped by source.
    pub fn formats(&self) -> Vec<(SourceType, Vec<String>)> {
        self.adapters
            .iter()
            .map(|a| {
                let ids = a.grammars().ids().into_iter().map(str::to_string).collect();
                (a.source_type(), ids)
            })
            .collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::from_catalog(builtin_catalog())
    }
}
