//! Label synthesis plus reconciliation against realistic shared documents.

mod common;

use serde_json::json;

use caddy_label_agent::discovery::ServiceRecord;
use caddy_label_agent::document::{ConfigDocument, Handler, HandlerEntry};
use caddy_label_agent::{synthesize, Reconciler, SynthesisOptions};

use common::{publish, route_ids, server_route_ids, service};

fn reconciler(agent: &str) -> Reconciler {
    Reconciler::new(agent, "0.0.0.0:2019", vec![":80".to_string(), ":443".to_string()])
}

fn sync(agent: &str, services: &[ServiceRecord], doc: &mut ConfigDocument) {
    let desired = synthesize(services, &SynthesisOptions::new(agent));
    reconciler(agent).reconcile(doc, &desired);
}

fn split_document() -> ConfigDocument {
    serde_json::from_value(json!({
        "apps": {
            "http": {
                "servers": {
                    "srv_http": { "listen": [":80"], "routes": [] },
                    "srv_https": {
                        "listen": [":443"],
                        "routes": [
                            {
                                "@id": "nodeb_api",
                                "match": [{ "host": ["api.example.com"] }],
                                "handle": [{ "handler": "reverse_proxy", "upstreams": [{ "dial": "10.0.0.9:8080" }] }]
                            },
                            {
                                "match": [{ "host": ["static.example.com"] }],
                                "handle": [{ "handler": "file_server", "root": "/srv" }]
                            }
                        ]
                    }
                }
            },
            "pki": { "certificate_authorities": { "local": { "install_trust": false } } }
        }
    }))
    .unwrap()
}

fn dials(doc: &ConfigDocument, id: &str) -> Vec<String> {
    let route = doc
        .routes()
        .find(|r| r.id.as_deref() == Some(id))
        .unwrap_or_else(|| panic!("route {id} missing"));
    route
        .handle
        .iter()
        .filter_map(|h| match h {
            HandlerEntry::Known(Handler::ReverseProxy(rp)) => Some(rp),
            _ => None,
        })
        .flat_map(|rp| rp.upstreams.iter().map(|u| u.dial.clone()))
        .collect()
}

#[test]
fn test_sync_is_idempotent() {
    let services = vec![
        service("web", "172.18.0.2", &[("caddy", "web.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")]),
        service(
            "wild",
            "172.18.0.3",
            &[
                ("caddy", "*.example.com"),
                ("caddy.reverse_proxy", "{{upstreams 8080}}"),
                ("caddy.tls.dns", "cloudflare secret-token"),
                ("caddy_9.email", "ops@example.com"),
            ],
        ),
    ];

    let mut doc = split_document();
    sync("nodea", &services, &mut doc);
    let first = serde_json::to_value(&doc).unwrap();

    sync("nodea", &services, &mut doc);
    assert_eq!(serde_json::to_value(&doc).unwrap(), first);
}

#[test]
fn test_foreign_and_anonymous_routes_survive() {
    let services = vec![service(
        "web",
        "172.18.0.2",
        &[("caddy", "web.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")],
    )];

    let mut doc = split_document();
    let before = doc.apps.http.servers["srv_https"].routes.clone();
    sync("nodea", &services, &mut doc);

    let after = &doc.apps.http.servers["srv_https"].routes;
    for route in &before {
        assert!(after.contains(route), "route {:?} was modified", route.id);
    }
    // Unmodelled apps pass through untouched.
    assert_eq!(
        serde_json::to_value(&doc).unwrap()["apps"]["pki"],
        json!({ "certificate_authorities": { "local": { "install_trust": false } } })
    );
}

#[test]
fn test_removed_service_routes_are_dropped() {
    let web = service("web", "172.18.0.2", &[("caddy", "web.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")]);
    let api = service("api", "172.18.0.4", &[("caddy", "api.internal"), ("caddy.reverse_proxy", "{{upstreams 9000}}")]);

    let mut doc = split_document();
    sync("nodea", &[web.clone(), api], &mut doc);
    assert!(route_ids(&doc).contains(&"nodea_api".to_string()));

    sync("nodea", &[web], &mut doc);
    let ids = route_ids(&doc);
    assert!(!ids.contains(&"nodea_api".to_string()));
    assert!(ids.contains(&"nodea_web".to_string()));
    assert!(ids.contains(&"nodeb_api".to_string()));
}

#[test]
fn test_mixed_domains_split_across_listeners() {
    let services = vec![service(
        "app",
        "172.18.0.7",
        &[
            ("caddy", "http://app.lan, app.example.com"),
            ("caddy.reverse_proxy", "{{upstreams 3000}}"),
        ],
    )];

    let mut doc = split_document();
    sync("nodea", &services, &mut doc);

    assert_eq!(server_route_ids(&doc, "srv_http"), vec!["nodea_app_http"]);
    assert!(server_route_ids(&doc, "srv_https").contains(&"nodea_app_https".to_string()));
    assert_eq!(dials(&doc, "nodea_app_http"), vec!["172.18.0.7:3000"]);
    assert_eq!(dials(&doc, "nodea_app_https"), vec!["172.18.0.7:3000"]);
}

#[test]
fn test_combined_listener_wins_over_unrelated_server() {
    let mut doc: ConfigDocument = serde_json::from_value(json!({
        "apps": { "http": { "servers": {
            "metrics": { "listen": [":9180"] },
            "srv0": { "listen": [":80", ":443"] }
        } } }
    }))
    .unwrap();
    let services = vec![service(
        "app",
        "172.18.0.7",
        &[
            ("caddy", "http://app.lan, app.example.com"),
            ("caddy.reverse_proxy", "{{upstreams 3000}}"),
        ],
    )];

    sync("nodea", &services, &mut doc);

    assert!(server_route_ids(&doc, "metrics").is_empty());
    assert_eq!(server_route_ids(&doc, "srv0"), vec!["nodea_app_http", "nodea_app_https"]);
}

#[test]
fn test_remote_addressing_uses_published_ports() {
    let services = vec![publish(
        service("web", "172.18.0.2", &[("caddy", "web.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")]),
        80,
        32768,
    )];
    let options = SynthesisOptions {
        remote_host: Some("192.168.1.20".to_string()),
        ..SynthesisOptions::new("edge")
    };

    let desired = synthesize(&services, &options);
    let mut doc = ConfigDocument::default();
    reconciler("edge").reconcile(&mut doc, &desired);

    assert_eq!(dials(&doc, "edge_web"), vec!["192.168.1.20:32768"]);
}

#[test]
fn test_empty_document_gets_skeleton_server() {
    let services = vec![service(
        "web",
        "172.18.0.2",
        &[("caddy", "web.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")],
    )];
    let mut doc = ConfigDocument::default();
    sync("nodea", &services, &mut doc);

    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["admin"]["listen"], "0.0.0.0:2019");
    assert_eq!(value["apps"]["http"]["servers"]["reverse_proxy"]["listen"], json!([":80", ":443"]));
    assert_eq!(server_route_ids(&doc, "reverse_proxy"), vec!["nodea_web"]);
}

#[test]
fn test_wildcard_routes_follow_exact_hosts() {
    let services = vec![
        service("catchall", "172.18.0.2", &[("caddy", "*.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")]),
        service("zebra", "172.18.0.3", &[("caddy", "zebra.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")]),
    ];

    let mut doc = split_document();
    sync("nodea", &services, &mut doc);

    let ids = server_route_ids(&doc, "srv_https");
    let wildcard = ids.iter().position(|id| id == "nodea_catchall").unwrap();
    let exact = ids.iter().position(|id| id == "nodea_zebra").unwrap();
    let foreign = ids.iter().position(|id| id == "nodeb_api").unwrap();
    assert!(exact < wildcard);
    assert!(foreign < wildcard);
}

#[test]
fn test_tls_policies_scoped_before_catch_all() {
    let services = vec![service(
        "wild",
        "172.18.0.3",
        &[
            ("caddy", "*.example.com"),
            ("caddy.reverse_proxy", "{{upstreams 8080}}"),
            ("caddy.tls.dns", "cloudflare secret-token"),
            ("caddy_9.email", "ops@example.com"),
        ],
    )];

    let mut doc = split_document();
    sync("nodea", &services, &mut doc);

    let policies = doc.policies();
    assert_eq!(policies.len(), 2);
    assert_eq!(policies[0].subjects, vec!["*.example.com"]);
    assert!(policies[1].is_catch_all());
    for policy in policies {
        assert_eq!(policy.issuers[0].email.as_deref(), Some("ops@example.com"));
    }

    let value = serde_json::to_value(&doc).unwrap();
    let provider = &value["apps"]["tls"]["automation"]["policies"][0]["issuers"][0]["challenges"]["dns"]["provider"];
    assert_eq!(provider["name"], "cloudflare");
    assert_eq!(provider["api_token"], "secret-token");

    let route = doc.routes().find(|r| r.id.as_deref() == Some("nodea_wild")).unwrap();
    assert!(route.terminal);
}

#[test]
fn test_two_agents_share_a_document() {
    let a = vec![service("web", "172.18.0.2", &[("caddy", "a.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")])];
    let b = vec![service("web", "172.19.0.2", &[("caddy", "b.example.com"), ("caddy.reverse_proxy", "{{upstreams 80}}")])];

    let mut doc = ConfigDocument::default();
    sync("alpha", &a, &mut doc);
    sync("beta", &b, &mut doc);
    sync("alpha", &[], &mut doc);

    assert_eq!(route_ids(&doc), vec!["beta_web"]);
    assert_eq!(dials(&doc, "beta_web"), vec!["172.19.0.2:80"]);
}
