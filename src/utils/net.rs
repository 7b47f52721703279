use std::net::IpAddr;
use std::net::UdpSocket;

/// accept `http(s)://host:port` or a bare `host:port`
pub(crate) fn address_str(addr: &str) -> String {
    let trimmed = addr.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Best-effort outbound interface address.
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local
/// address routes to the target.
pub(crate) fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}
