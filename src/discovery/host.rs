//! Host address detection for remote upstream addressing.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Outbound interface address of this host.
///
/// Connecting a UDP socket sends no packets; it only selects the route,
/// which reveals the local address used to reach the outside.
pub fn detect_host_ip() -> IpAddr {
    let detected = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());

    match detected {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => {
            tracing::warn!("Host IP detection returned an unspecified address, using 127.0.0.1");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to auto-detect host IP, using 127.0.0.1");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
