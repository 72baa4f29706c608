use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// LAN address other devices can reach this machine on.
///
/// Connecting a UDP socket picks the outbound interface without sending
/// anything. Falls back to loopback when there is no route.
pub fn local_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(("8.8.8.8", 80))?;
        Ok(socket.local_addr()?.ip())
    };
    match probe() {
        Ok(ip) if !ip.is_unspecified() => ip,
        _ => IpAddr::V4(Ipv4Addr::LOCALHOST),
    }
}

/// Host placed in image URLs and the QR code: the configured one, else the
/// detected LAN address.
pub fn public_host(configured: Option<&str>) -> String {
    match configured.map(str::trim) {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => local_ip().to_string(),
    }
}
