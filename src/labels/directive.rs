//! Recognized directive families.

use std::fmt;

/// A label directive, parsed once from its dot-delimited name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// The bare `<prefix>` / `<prefix>_N` label: domain list or snippet name.
    Domain,
    ReverseProxy,
    Import,
    TlsDns,
    TlsResolvers,
    Transport,
    TransportTls,
    TransportTlsInsecureSkipVerify,
    /// `reverse_proxy.header_up`, optionally suffixed `_N` for repeats.
    HeaderUp,
    /// `reverse_proxy.header_down`, optionally suffixed `_N` for repeats.
    HeaderDown,
    HandleAbort,
    Email,
    AutoHttps,
    /// Any name outside the fixed grammar.
    Ignored,
}

impl Directive {
    pub fn parse(name: &str) -> Self {
        match name {
            "" => Self::Domain,
            "reverse_proxy" => Self::ReverseProxy,
            "import" => Self::Import,
            "tls.dns" => Self::TlsDns,
            "tls.resolvers" => Self::TlsResolvers,
            "transport" => Self::Transport,
            "transport.tls" => Self::TransportTls,
            "transport.tls_insecure_skip_verify" => Self::TransportTlsInsecureSkipVerify,
            "handle.abort" => Self::HandleAbort,
            "email" => Self::Email,
            "auto_https" => Self::AutoHttps,
            other => {
                if is_repeatable(other, "reverse_proxy.header_up") {
                    Self::HeaderUp
                } else if is_repeatable(other, "reverse_proxy.header_down") {
                    Self::HeaderDown
                } else {
                    Self::Ignored
                }
            }
        }
    }

    pub fn is_ignored(self) -> bool {
        self == Self::Ignored
    }
}

/// `base` itself or `base_<digits>`.
fn is_repeatable(name: &str, base: &str) -> bool {
    match name.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('_')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Domain => "<domain>",
            Self::ReverseProxy => "reverse_proxy",
            Self::Import => "import",
            Self::TlsDns => "tls.dns",
            Self::TlsResolvers => "tls.resolvers",
            Self::Transport => "transport",
            Self::TransportTls => "transport.tls",
            Self::TransportTlsInsecureSkipVerify => "transport.tls_insecure_skip_verify",
            Self::HeaderUp => "reverse_proxy.header_up",
            Self::HeaderDown => "reverse_proxy.header_down",
            Self::HandleAbort => "handle.abort",
            Self::Email => "email",
            Self::AutoHttps => "auto_https",
            Self::Ignored => "<ignored>",
        };
        f.write_str(name)
    }
}
