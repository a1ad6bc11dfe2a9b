//! Directive translators.
//!
//! Each translator is a pure function from a resolved directive bundle to
//! one fragment of the route or of the TLS policy set:
//!
//! ```text
//! reverse_proxy          → upstream.rs  → upstreams[].dial
//! tls.dns, tls.resolvers → tls.rs       → TlsFragment (policy aggregator)
//! transport*             → transport.rs → reverse_proxy.transport
//! reverse_proxy.header_* → headers.rs   → reverse_proxy.headers
//! handle.abort           → handle.rs    → static_response pre-handler
//! ```

pub mod handle;
pub mod headers;
pub mod tls;
pub mod transport;
pub mod upstream;

pub use handle::translate_handle;
pub use headers::{parse_header_rule, translate_headers, HeaderRule};
pub use tls::{translate_tls, DnsChallenge, TlsFragment};
pub use transport::translate_transport;
pub use upstream::{ResolveError, UpstreamResolver};
