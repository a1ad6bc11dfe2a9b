//! Route assembly: one resolved bundle → one or two proxy routes.
//!
//! # Data Flow
//! ```text
//! DirectiveBundle (snippets applied)
//!     → split_domains        "http://a.lan, b.lan" → http [a.lan] / https [b.lan]
//!     → translate_handle     pre-handlers (abort)
//!     → UpstreamResolver     reverse_proxy upstreams
//!     → translate_headers / translate_transport
//!     → Route per non-empty domain set, handler chain cloned into each
//! ```
//!
//! # Identifiers
//! `<agent>_<service>[_<index>][_http|_https]`. The index suffix is left
//! out for the default index; the protocol suffix only appears when the
//! bundle produced both an HTTP-only and an HTTPS route.

use std::fmt;

use thiserror::Error;

use crate::discovery::ServiceRecord;
use crate::document::{
    Handler, HandlerEntry, MatcherSet, ReverseProxyHandler, Route, Upstream, ID_DELIMITER,
};
use crate::labels::{Directive, DirectiveBundle, RouteIndex};
use crate::translate::{
    translate_handle, translate_headers, translate_tls, translate_transport, ResolveError,
    TlsFragment, UpstreamResolver,
};

const HTTP_MARKER: &str = "http://";
const HTTPS_MARKER: &str = "https://";

/// Which listener class a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteProtocol {
    /// Plain HTTP only (`http://` domains).
    Http,
    /// Eligible for automatic HTTPS.
    Https,
}

impl RouteProtocol {
    fn suffix(self) -> &'static str {
        match self {
            RouteProtocol::Http => "http",
            RouteProtocol::Https => "https",
        }
    }
}

impl fmt::Display for RouteProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Domains of one bundle, partitioned by protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    pub http: Vec<String>,
    pub https: Vec<String>,
}

impl DomainSet {
    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.https.is_empty()
    }
}

/// Split a comma-separated domain list. `http://` sends a domain to the
/// HTTP-only set; an optional `https://` prefix is stripped.
pub fn split_domains(list: &str) -> DomainSet {
    let mut set = DomainSet::default();
    for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (target, host) = match strip_scheme(token, HTTP_MARKER) {
            Some(host) => (&mut set.http, host),
            None => (
                &mut set.https,
                strip_scheme(token, HTTPS_MARKER).unwrap_or(token),
            ),
        };
        let host = host.trim_end_matches('/');
        if !host.is_empty() && !target.iter().any(|h| h == host) {
            target.push(host.to_string());
        }
    }
    set
}

fn strip_scheme<'a>(token: &'a str, scheme: &str) -> Option<&'a str> {
    token
        .get(..scheme.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
        .map(|_| token[scheme.len()..].trim())
}

/// Why a bundle produced no routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("route has no domain")]
    NoDomain,

    #[error("route has no reverse_proxy directive")]
    NoUpstream,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// A route ready for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRoute {
    pub route: Route,
    pub protocol: RouteProtocol,
    /// TLS settings for this route's hosts. Only set on HTTPS routes.
    pub tls: Option<TlsFragment>,
}

impl AssembledRoute {
    pub fn id(&self) -> &str {
        self.route.id.as_deref().unwrap_or_default()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.route.hosts().map(str::to_string).collect()
    }
}

/// Builds routes for one agent.
#[derive(Debug, Clone, Copy)]
pub struct RouteAssembler<'a> {
    agent_id: &'a str,
    remote_host: Option<&'a str>,
}

impl<'a> RouteAssembler<'a> {
    pub fn new(agent_id: &'a str, remote_host: Option<&'a str>) -> Self {
        Self {
            agent_id,
            remote_host,
        }
    }

    /// Deterministic route identifier.
    pub fn route_id(
        &self,
        service: &str,
        index: &RouteIndex,
        protocol: Option<RouteProtocol>,
    ) -> String {
        let mut id = format!("{}{}{}", self.agent_id, ID_DELIMITER, service);
        if !index.is_default() {
            id.push(ID_DELIMITER);
            id.push_str(index.as_str());
        }
        if let Some(protocol) = protocol {
            id.push(ID_DELIMITER);
            id.push_str(protocol.suffix());
        }
        id
    }

    /// Assemble the routes of one bundle. Errors mean the bundle is
    /// skipped; the caller logs and moves on.
    pub fn assemble(
        &self,
        service: &ServiceRecord,
        index: &RouteIndex,
        bundle: &DirectiveBundle,
    ) -> Result<Vec<AssembledRoute>, AssembleError> {
        let domains = bundle
            .domain()
            .map(split_domains)
            .filter(|d| !d.is_empty())
            .ok_or(AssembleError::NoDomain)?;

        let target = bundle
            .first(Directive::ReverseProxy)
            .filter(|v| !v.trim().is_empty())
            .ok_or(AssembleError::NoUpstream)?;
        let upstreams = UpstreamResolver::new(service, self.remote_host).resolve_all(target)?;

        let mut handle: Vec<HandlerEntry> = translate_handle(bundle)
            .into_iter()
            .map(HandlerEntry::from)
            .collect();
        handle.push(
            Handler::ReverseProxy(ReverseProxyHandler {
                upstreams: upstreams.into_iter().map(Upstream::new).collect(),
                headers: translate_headers(bundle),
                transport: translate_transport(bundle),
                ..ReverseProxyHandler::default()
            })
            .into(),
        );

        let tls = translate_tls(bundle);
        let split = !domains.http.is_empty() && !domains.https.is_empty();
        let mut routes = Vec::with_capacity(2);

        for (protocol, hosts) in [
            (RouteProtocol::Http, domains.http),
            (RouteProtocol::Https, domains.https),
        ] {
            if hosts.is_empty() {
                continue;
            }
            let tls = match protocol {
                RouteProtocol::Https => tls.clone(),
                RouteProtocol::Http => None,
            };
            let id = self.route_id(&service.name, index, split.then_some(protocol));
            tracing::debug!(route_id = %id, protocol = %protocol, hosts = ?hosts, "Assembled route");

            routes.push(AssembledRoute {
                route: Route {
                    id: Some(id),
                    matchers: vec![MatcherSet {
                        host: hosts,
                        ..MatcherSet::default()
                    }],
                    handle: handle.clone(),
                    terminal: tls.as_ref().is_some_and(|t| t.dns.is_some()),
                    ..Route::default()
                },
                protocol,
                tls,
            });
        }

        Ok(routes)
    }
}
