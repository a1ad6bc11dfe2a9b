//! Typed model of the Caddy JSON configuration.
//!
//! Only the parts of the document this agent reads or writes are modeled
//! as fields. Everything else lands in the `extra` map of the nearest
//! enclosing struct.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between the segments of a route identifier.
/// The first segment names the owning agent.
pub const ID_DELIMITER: char = '_';

/// Name of the server created when the document has none.
pub const DEFAULT_SERVER_NAME: &str = "reverse_proxy";

fn is_false(value: &bool) -> bool {
    !*value
}

/// Root of the proxy configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminSection>,

    #[serde(default)]
    pub apps: Apps,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// A fresh document with one server listening on `listen`.
    pub fn skeleton(admin_listen: &str, listen: &[String]) -> Self {
        let mut doc = Self::default();
        doc.set_admin_listen(admin_listen);
        doc.apps.http.servers.insert(
            DEFAULT_SERVER_NAME.to_string(),
            Server {
                listen: listen.to_vec(),
                ..Server::default()
            },
        );
        doc
    }

    /// Pin the admin endpoint so the pushed config keeps the API reachable.
    pub fn set_admin_listen(&mut self, listen: &str) {
        self.admin
            .get_or_insert_with(AdminSection::default)
            .listen = Some(listen.to_string());
    }

    /// TLS automation policies, creating the surrounding sections on demand.
    pub fn policies_mut(&mut self) -> &mut Vec<AutomationPolicy> {
        &mut self
            .apps
            .tls
            .get_or_insert_with(TlsApp::default)
            .automation
            .get_or_insert_with(Automation::default)
            .policies
    }

    /// TLS automation policies, empty when the document has none.
    pub fn policies(&self) -> &[AutomationPolicy] {
        self.apps
            .tls
            .as_ref()
            .and_then(|tls| tls.automation.as_ref())
            .map(|automation| automation.policies.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate every route of every server.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.apps.http.servers.values().flat_map(|s| s.routes.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdminSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Apps {
    #[serde(default)]
    pub http: HttpApp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsApp>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HttpApp {
    /// Servers by name. Iteration order is by name.
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One listener group and its ordered route list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Server {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listen: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_https: Option<AutomaticHttps>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Server {
    /// True if any listen address binds `port` (e.g. `":80"`, `"0.0.0.0:80"`,
    /// `"tcp/:80"`, or a range such as `":80-443"` covering it).
    pub fn listens_on(&self, port: u16) -> bool {
        self.listen.iter().any(|addr| {
            let Some((_, ports)) = addr.rsplit_once(':') else {
                return false;
            };
            match ports.split_once('-') {
                Some((lo, hi)) => match (lo.parse::<u16>(), hi.parse::<u16>()) {
                    (Ok(lo), Ok(hi)) => (lo..=hi).contains(&port),
                    _ => false,
                },
                None => ports.parse::<u16>() == Ok(port),
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AutomaticHttps {
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_redirects: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub prefer_wildcard: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single externally matchable route.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Route {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatcherSet>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handle: Vec<HandlerEntry>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub terminal: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Route {
    /// Agent that owns this route: the identifier's first segment.
    /// Routes without an identifier or delimiter have no owner.
    pub fn owner(&self) -> Option<&str> {
        self.id
            .as_deref()
            .and_then(|id| id.split_once(ID_DELIMITER))
            .map(|(owner, _)| owner)
    }

    pub fn is_owned_by(&self, agent_id: &str) -> bool {
        self.owner() == Some(agent_id)
    }

    /// All hosts across all matcher sets.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.matchers
            .iter()
            .flat_map(|m| m.host.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MatcherSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A handler as found in a route. Handlers this agent does not model are
/// carried through verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HandlerEntry {
    Known(Handler),
    Opaque(Value),
}

impl From<Handler> for HandlerEntry {
    fn from(handler: Handler) -> Self {
        HandlerEntry::Known(handler)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum Handler {
    ReverseProxy(ReverseProxyHandler),
    StaticResponse(StaticResponseHandler),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReverseProxyHandler {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstreams: Vec<Upstream>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderRewrite>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<HttpTransport>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Upstream {
    pub dial: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Upstream {
    pub fn new(dial: impl Into<String>) -> Self {
        Self {
            dial: dial.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HeaderRewrite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HeaderOps>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HeaderOps>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HeaderOps {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub add: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HeaderOps {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.set.is_empty() && self.delete.is_empty() && self.extra.is_empty()
    }
}

/// Outbound transport toward the upstream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpTransport {
    pub protocol: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TransportTls>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            tls: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TransportTls {
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure_skip_verify: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StaticResponseHandler {
    #[serde(default, skip_serializing_if = "is_false")]
    pub abort: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TlsApp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation: Option<Automation>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Automation {
    #[serde(default)]
    pub policies: Vec<AutomationPolicy>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Certificate automation policy. No subjects means catch-all.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AutomationPolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuers: Vec<Issuer>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AutomationPolicy {
    pub fn is_catch_all(&self) -> bool {
        self.subjects.is_empty()
    }

    /// True if both policies cover the same subjects, ignoring order.
    pub fn same_subjects(&self, other: &AutomationPolicy) -> bool {
        let mut a: Vec<&str> = self.subjects.iter().map(String::as_str).collect();
        let mut b: Vec<&str> = other.subjects.iter().map(String::as_str).collect();
        a.sort_unstable();
        a.dedup();
        b.sort_unstable();
        b.dedup();
        a == b
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Issuer {
    pub module: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenges: Option<Challenges>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issuer {
    pub const ACME: &'static str = "acme";

    pub fn acme() -> Self {
        Self {
            module: Self::ACME.to_string(),
            email: None,
            challenges: None,
            extra: Map::new(),
        }
    }

    pub fn is_acme(&self) -> bool {
        self.module == Self::ACME
    }

    /// The configured email, if present and non-empty.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Challenges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsChallengeConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DnsChallengeConfig {
    pub provider: DnsProvider,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolvers: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// DNS provider module. The credential stays an opaque placeholder such as
/// `{env.CF_API_TOKEN}`; the proxy expands it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DnsProvider {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "admin": {"listen": "0.0.0.0:2019", "enforce_origin": true},
            "logging": {"logs": {"default": {"level": "DEBUG"}}},
            "apps": {
                "http": {
                    "servers": {
                        "srv0": {
                            "listen": [":443"],
                            "routes": [{
                                "@id": "other_web",
                                "match": [{"host": ["a.lan"], "path": ["/api/*"]}],
                                "handle": [
                                    {"handler": "subroute", "routes": []},
                                    {"handler": "reverse_proxy",
                                     "upstreams": [{"dial": "a:80", "max_requests": 5}],
                                     "load_balancing": {"selection_policy": {"policy": "first"}}}
                                ]
                            }]
                        }
                    }
                },
                "pki": {"certificate_authorities": {}}
            }
        });

        let doc: ConfigDocument = serde_json::from_value(raw.clone()).unwrap();
        let route = &doc.apps.http.servers["srv0"].routes[0];
        assert!(matches!(route.handle[0], HandlerEntry::Opaque(_)));
        assert!(matches!(
            route.handle[1],
            HandlerEntry::Known(Handler::ReverseProxy(_))
        ));

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_omitted_lists_stay_omitted() {
        let raw = json!({
            "apps": {
                "http": {
                    "servers": {
                        "bare": {"automatic_https": {"disable": true}},
                        "srv0": {
                            "listen": [":443"],
                            "routes": [{
                                "@id": "other_dynamic",
                                "handle": [{"handler": "reverse_proxy", "dynamic_upstreams": {"source": "srv"}}]
                            }]
                        }
                    }
                }
            }
        });

        let doc: ConfigDocument = serde_json::from_value(raw.clone()).unwrap();
        assert!(doc.apps.http.servers["bare"].listen.is_empty());
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_route_owner() {
        let route = Route {
            id: Some("agent1_web_2".into()),
            ..Route::default()
        };
        assert_eq!(route.owner(), Some("agent1"));
        assert!(route.is_owned_by("agent1"));
        assert!(!route.is_owned_by("agent"));

        let anonymous = Route::default();
        assert_eq!(anonymous.owner(), None);

        let undelimited = Route {
            id: Some("manual".into()),
            ..Route::default()
        };
        assert_eq!(undelimited.owner(), None);
    }

    #[test]
    fn test_listens_on() {
        let server = Server {
            listen: vec![":80".into(), "tcp/0.0.0.0:8443-8444".into()],
            ..Server::default()
        };
        assert!(server.listens_on(80));
        assert!(server.listens_on(8444));
        assert!(!server.listens_on(443));
    }

    #[test]
    fn test_same_subjects_ignores_order() {
        let a = AutomationPolicy {
            subjects: vec!["a.lan".into(), "*.a.lan".into()],
            ..AutomationPolicy::default()
        };
        let b = AutomationPolicy {
            subjects: vec!["*.a.lan".into(), "a.lan".into()],
            ..AutomationPolicy::default()
        };
        assert!(a.same_subjects(&b));
    }

    #[test]
    fn test_skeleton() {
        let doc = ConfigDocument::skeleton("0.0.0.0:2019", &[":80".into(), ":443".into()]);
        assert_eq!(
            doc.admin.as_ref().and_then(|a| a.listen.as_deref()),
            Some("0.0.0.0:2019")
        );
        assert!(doc.apps.http.servers.contains_key(DEFAULT_SERVER_NAME));
        assert!(doc.policies().is_empty());
    }
}
