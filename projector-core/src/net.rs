//! Local network address detection

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Address the OS would use to reach the wider network
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a
/// route and with it a source address. Falls back to loopback when there is
/// no route (offline machine).
pub fn local_ip() -> IpAddr {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| s.connect("8.8.8.8:80").map(|()| s))
        .and_then(|s| s.local_addr())
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |addr| addr.ip())
}

/// Host viewers should use: the configured override, else the detected address
pub fn advertised_host(advertise_host: Option<&str>) -> String {
    match advertise_host {
        Some(host) if !host.trim().is_empty() => host.trim().to_string(),
        _ => local_ip().to_string(),
    }
}
