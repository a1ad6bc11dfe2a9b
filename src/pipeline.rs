//! Route synthesis: discovered services → desired proxy state.
//!
//! # Data Flow
//! ```text
//! ServiceRecord[] (sorted by name, id; filtered)
//!     → LabelParser            per-service bundles
//!     → pass 1: SnippetTable + GlobalSettings (merged across services)
//!     → pass 2: SnippetTable::resolve → RouteAssembler → AssembledRoute[]
//!     → PolicySet              one policy per HTTPS route with tls.dns
//!     → DesiredState
//! ```
//!
//! Synthesis is pure: the same services and options always yield the same
//! state. Per-route failures are logged and skipped.

use std::collections::BTreeSet;

use crate::discovery::{ServiceFilter, ServiceRecord};
use crate::labels::{LabelParser, ParsedLabels, SnippetTable};
use crate::policy::{GlobalSettings, PolicySet};
use crate::reconcile::DesiredState;
use crate::routing::RouteAssembler;

/// Inputs to synthesis besides the services themselves.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub agent_id: String,
    pub label_prefix: String,
    /// Effective host address for remote upstream addressing.
    pub remote_host: Option<String>,
    pub filter: Option<ServiceFilter>,
}

impl SynthesisOptions {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            label_prefix: "caddy".to_string(),
            remote_host: None,
            filter: None,
        }
    }
}

/// Compute the desired state for `services`.
pub fn synthesize(services: &[ServiceRecord], options: &SynthesisOptions) -> DesiredState {
    let parser = LabelParser::new(options.label_prefix.as_str());

    let mut ordered: Vec<&ServiceRecord> = services
        .iter()
        .filter(|service| match &options.filter {
            Some(filter) if !filter.matches(&service.labels) => {
                tracing::trace!(service = %service.name, filter = %filter, "Service filtered out");
                false
            }
            _ => true,
        })
        .collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    let parsed: Vec<(&ServiceRecord, ParsedLabels)> = ordered
        .into_iter()
        .map(|service| (service, parser.parse(&service.labels)))
        .filter(|(_, labels)| !labels.is_empty())
        .collect();

    let mut snippets = SnippetTable::new();
    let mut settings = GlobalSettings::new();
    for (service, labels) in &parsed {
        for (name, bundle) in labels.snippet_definitions() {
            tracing::debug!(service = %service.name, snippet = %name, "Snippet defined");
            snippets.insert(name, bundle.clone());
        }
        settings.merge(&service.name, labels.global_settings());
    }

    let assembler = RouteAssembler::new(&options.agent_id, options.remote_host.as_deref());
    let mut routes = Vec::new();
    let mut policies = PolicySet::new();
    let mut seen = BTreeSet::new();

    for (service, labels) in &parsed {
        for (index, bundle) in labels.routes() {
            let context = format!("{}[{}]", service.name, index);
            let resolved = snippets.resolve(bundle, &context);

            match assembler.assemble(service, index, &resolved) {
                Ok(assembled) => {
                    for route in assembled {
                        if !seen.insert(route.id().to_string()) {
                            tracing::warn!(route_id = %route.id(), "Duplicate route identifier, keeping first");
                            continue;
                        }
                        policies.add_route(&route);
                        routes.push(route);
                    }
                }
                Err(e) => {
                    tracing::warn!(service = %service.name, index = %index, error = %e, "Skipping route");
                }
            }
        }
    }

    tracing::debug!(
        services = parsed.len(),
        routes = routes.len(),
        policies = policies.len(),
        snippets = snippets.len(),
        "Synthesized desired state"
    );

    DesiredState {
        routes,
        policies,
        settings,
    }
}
