//! Merge this agent's desired state into the shared document.
//!
//! # Responsibilities
//! - Preserve every route this agent does not own
//! - Replace own routes in place, drop stale ones, append new ones
//! - Place HTTP-only and HTTPS routes on the right listener
//! - Keep exact-host routes ahead of wildcard routes
//! - Merge TLS policies and server-wide settings
//!
//! # Listener Layout
//! ```text
//! servers on :80 and :443 differ → Split { http → :80 server, https → :443 server }
//! otherwise                      → Single (the :443 server, else the :80 server,
//!                                  else the first by name gets both)
//! no servers                     → skeleton server created, Single
//! ```
//!
//! # Design Decisions
//! - Ownership is the identifier prefix up to the first `_`
//! - Routes without an identifier are never touched
//! - Own routes are stripped from non-target servers so a route moving
//!   between listeners leaves no stale copy

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{ConfigDocument, Route, Server, DEFAULT_SERVER_NAME};
use crate::policy::merge_policies;
use crate::reconcile::desired::DesiredState;
use crate::routing::{order_by_specificity, RouteProtocol};

/// Where each route class goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerLayout {
    Split { http: String, https: String },
    Single(String),
}

impl ListenerLayout {
    pub fn server_for(&self, protocol: RouteProtocol) -> &str {
        match (self, protocol) {
            (ListenerLayout::Single(name), _) => name,
            (ListenerLayout::Split { http, .. }, RouteProtocol::Http) => http,
            (ListenerLayout::Split { https, .. }, RouteProtocol::Https) => https,
        }
    }

    pub fn servers(&self) -> Vec<&str> {
        match self {
            ListenerLayout::Single(name) => vec![name.as_str()],
            ListenerLayout::Split { http, https } => vec![http.as_str(), https.as_str()],
        }
    }
}

/// Decide the layout, creating a server when the document has none.
pub fn detect_layout(doc: &mut ConfigDocument, skeleton_listen: &[String]) -> ListenerLayout {
    let servers = &mut doc.apps.http.servers;
    if servers.is_empty() {
        tracing::info!(server = DEFAULT_SERVER_NAME, "Document has no servers, creating one");
        servers.insert(
            DEFAULT_SERVER_NAME.to_string(),
            Server {
                listen: skeleton_listen.to_vec(),
                ..Server::default()
            },
        );
    }

    let http = servers
        .iter()
        .find(|(_, s)| s.listens_on(80) && !s.listens_on(443))
        .map(|(name, _)| name.clone());
    let https = servers
        .iter()
        .find(|(_, s)| s.listens_on(443))
        .map(|(name, _)| name.clone());

    match (http, https) {
        (Some(http), Some(https)) if http != https => ListenerLayout::Split { http, https },
        (_, https) => {
            let combined = https
                .or_else(|| {
                    servers
                        .iter()
                        .find(|(_, s)| s.listens_on(80))
                        .map(|(name, _)| name.clone())
                })
                .or_else(|| servers.keys().next().cloned())
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
            ListenerLayout::Single(combined)
        }
    }
}

/// What a merge changed, by route identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<String>,
    pub replaced: Vec<String>,
    pub removed: Vec<String>,
    /// Routes left untouched because another agent or an operator owns them.
    pub preserved: usize,
}

impl MergeReport {
    pub fn owned(&self) -> usize {
        self.added.len() + self.replaced.len()
    }
}

/// Merges for one agent.
#[derive(Debug, Clone)]
pub struct Reconciler {
    agent_id: String,
    admin_listen: String,
    skeleton_listen: Vec<String>,
}

impl Reconciler {
    pub fn new(
        agent_id: impl Into<String>,
        admin_listen: impl Into<String>,
        skeleton_listen: Vec<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            admin_listen: admin_listen.into(),
            skeleton_listen,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Document used when neither the proxy nor the cache has one.
    pub fn skeleton(&self) -> ConfigDocument {
        ConfigDocument::skeleton(&self.admin_listen, &self.skeleton_listen)
    }

    /// Apply `desired` to `doc` in place.
    pub fn reconcile(&self, doc: &mut ConfigDocument, desired: &DesiredState) -> MergeReport {
        doc.set_admin_listen(&self.admin_listen);
        let layout = detect_layout(doc, &self.skeleton_listen);

        let previous: BTreeSet<String> = doc
            .routes()
            .filter(|r| r.is_owned_by(&self.agent_id))
            .filter_map(|r| r.id.clone())
            .collect();

        // Fresh routes by id, with their target server.
        let mut pending: BTreeMap<&str, (&str, &Route)> = desired
            .routes
            .iter()
            .map(|r| (r.id(), (layout.server_for(r.protocol), &r.route)))
            .collect();

        let mut report = MergeReport::default();
        for (name, server) in doc.apps.http.servers.iter_mut() {
            let routes = std::mem::take(&mut server.routes);
            for route in routes {
                if !route.is_owned_by(&self.agent_id) {
                    report.preserved += 1;
                    server.routes.push(route);
                    continue;
                }
                let id = route.id.as_deref().unwrap_or_default();
                let stays_here = matches!(pending.get(id), Some((target, _)) if *target == name.as_str());
                if stays_here {
                    if let Some((_, fresh)) = pending.remove(id) {
                        server.routes.push(fresh.clone());
                    }
                }
            }
        }

        for route in &desired.routes {
            if let Some((target, fresh)) = pending.remove(route.id()) {
                if let Some(server) = doc.apps.http.servers.get_mut(target) {
                    server.routes.push(fresh.clone());
                }
            }
        }

        for name in layout.servers() {
            if let Some(server) = doc.apps.http.servers.get_mut(name) {
                order_by_specificity(&mut server.routes);
                if let Some(mode) = desired.settings.auto_https() {
                    mode.apply(server);
                }
            }
        }

        let fresh = desired.route_ids();
        for id in &fresh {
            if previous.contains(id) {
                report.replaced.push(id.clone());
            } else {
                report.added.push(id.clone());
            }
        }
        report.removed = previous.difference(&fresh).cloned().collect();

        if !desired.policies.is_empty()
            || desired.settings.email().is_some()
            || !doc.policies().is_empty()
        {
            merge_policies(doc.policies_mut(), &desired.policies, &desired.settings);
        }

        tracing::debug!(
            agent_id = %self.agent_id,
            layout = ?layout,
            added = report.added.len(),
            replaced = report.replaced.len(),
            removed = report.removed.len(),
            preserved = report.preserved,
            "Merged desired state"
        );
        report
    }
}
