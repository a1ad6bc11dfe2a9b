//! `tls.*` directives: DNS challenge configuration.
//!
//! The result is not embedded in the route; the policy aggregator turns
//! it into a certificate automation policy for the route's HTTPS hosts.

use serde_json::Map;

use crate::document::{Challenges, DnsChallengeConfig, DnsProvider, Issuer};
use crate::labels::{Directive, DirectiveBundle};

/// TLS settings requested by one route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsFragment {
    pub dns: Option<DnsChallenge>,
    pub resolvers: Vec<String>,
}

/// `tls.dns <provider> <credential...>`. The credential is kept verbatim,
/// placeholders included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsChallenge {
    pub provider: String,
    pub credential: String,
}

impl TlsFragment {
    /// ACME issuer solving the DNS challenge, if one was requested.
    pub fn issuer(&self) -> Option<Issuer> {
        let dns = self.dns.as_ref()?;
        let mut issuer = Issuer::acme();
        issuer.challenges = Some(Challenges {
            dns: Some(DnsChallengeConfig {
                provider: DnsProvider {
                    name: dns.provider.clone(),
                    api_token: Some(dns.credential.clone()),
                    extra: Map::new(),
                },
                resolvers: self.resolvers.clone(),
                extra: Map::new(),
            }),
            extra: Map::new(),
        });
        Some(issuer)
    }
}

/// Translate `tls.dns` and `tls.resolvers`. `None` if neither is set.
pub fn translate_tls(bundle: &DirectiveBundle) -> Option<TlsFragment> {
    let dns_value = bundle.first(Directive::TlsDns);
    let resolvers_value = bundle.first(Directive::TlsResolvers);
    if dns_value.is_none() && resolvers_value.is_none() {
        return None;
    }

    let dns = dns_value.and_then(|value| {
        let value = value.trim();
        match value.split_once(char::is_whitespace) {
            Some((provider, credential)) if !credential.trim().is_empty() => {
                tracing::debug!(provider = %provider, "TLS DNS challenge requested");
                Some(DnsChallenge {
                    provider: provider.to_string(),
                    credential: credential.trim().to_string(),
                })
            }
            _ => {
                tracing::warn!(value = %value, "Ignoring tls.dns without provider credential");
                None
            }
        }
    });

    let resolvers = resolvers_value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Some(TlsFragment { dns, resolvers })
}
