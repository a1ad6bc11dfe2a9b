//! Shared configuration document (Caddy JSON config).
//!
//! # Data Flow
//! ```text
//! GET /config/  ──▶ ConfigDocument (typed, unknown fields kept in `extra`)
//!                     → reconcile (own routes replaced, others untouched)
//!                     → cache.rs (persist locally)
//! POST /load    ◀── ConfigDocument (whole document, never a patch)
//! ```
//!
//! # Design Decisions
//! - Every struct carries a flattened `extra` map; fields this agent does
//!   not model survive a fetch/push round trip unchanged
//! - Empty collections and `false` flags are omitted on serialization

pub mod cache;
pub mod schema;

pub use cache::{CacheError, CacheStore};
pub use schema::{
    AdminSection, Apps, Automation, AutomaticHttps, AutomationPolicy, Challenges, ConfigDocument,
    DnsChallengeConfig, DnsProvider, Handler, HandlerEntry, HeaderOps, HeaderRewrite, HttpApp,
    HttpTransport, Issuer, MatcherSet, ReverseProxyHandler, Route, Server, StaticResponseHandler,
    TlsApp, TransportTls, Upstream, DEFAULT_SERVER_NAME, ID_DELIMITER,
};
