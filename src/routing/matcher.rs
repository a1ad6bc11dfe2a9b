//! Host classification and route ordering.
//!
//! # Responsibilities
//! - Classify hosts as exact or wildcard
//! - Order a server's routes so exact hosts are matched before wildcards
//!
//! # Design Decisions
//! - A route is a wildcard route if ANY of its hosts contains `*`
//! - Ordering is a stable partition: relative order inside each class is kept
//! - Routes without host matchers count as exact

use crate::document::Route;

/// True if the host pattern contains a wildcard label.
pub fn is_wildcard_host(host: &str) -> bool {
    host.contains('*')
}

/// True if any host bound by the route is a wildcard.
pub fn is_wildcard_route(route: &Route) -> bool {
    route.hosts().any(is_wildcard_host)
}

/// Stable partition: exact-host routes first, wildcard routes last.
pub fn order_by_specificity(routes: &mut Vec<Route>) {
    let (exact, wildcard): (Vec<Route>, Vec<Route>) =
        routes.drain(..).partition(|route| !is_wildcard_route(route));
    routes.extend(exact);
    routes.extend(wildcard);
}
