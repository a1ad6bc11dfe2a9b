//! `transport*` directives: how the proxy talks to the upstream.

use crate::document::{HttpTransport, TransportTls};
use crate::labels::{Directive, DirectiveBundle};

/// Flag directives are on unless explicitly switched off.
fn enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "off" | "no" | "0"
    )
}

/// Translate `transport`, `transport.tls` and
/// `transport.tls_insecure_skip_verify`. `None` when none is set.
pub fn translate_transport(bundle: &DirectiveBundle) -> Option<HttpTransport> {
    let protocol = bundle.first(Directive::Transport);
    let tls = bundle.first(Directive::TransportTls).map(enabled);
    let skip_verify = bundle
        .first(Directive::TransportTlsInsecureSkipVerify)
        .map(enabled);

    if protocol.is_none() && tls.is_none() && skip_verify.is_none() {
        return None;
    }

    let mut transport = HttpTransport::default();
    if let Some(protocol) = protocol.map(str::trim).filter(|p| !p.is_empty()) {
        transport.protocol = protocol.to_string();
    }

    let skip_verify = skip_verify.unwrap_or(false);
    if tls.unwrap_or(false) || skip_verify {
        transport.tls = Some(TransportTls {
            insecure_skip_verify: skip_verify,
            ..TransportTls::default()
        });
        if skip_verify {
            tracing::info!("Backend TLS certificate verification disabled");
        }
    }

    Some(transport)
}
