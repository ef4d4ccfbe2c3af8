//! Service instance identification.

use std::net::UdpSocket;
use tracing::debug;

/// Fallback instance name when no route is available.
pub const UNKNOWN_INSTANCE: &str = "unknown_ip";

/// Returns the preferred outbound IP address of this host.
///
/// Connecting a UDP socket sends nothing on the wire; it only asks the OS
/// which local address would be used to reach a public destination.
pub fn service_instance() -> String {
    // ---
    outbound_ip("8.8.8.8:80").unwrap_or_else(|| UNKNOWN_INSTANCE.to_string())
}

fn outbound_ip(target: &str) -> Option<String> {
    // ---
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    if let Err(e) = socket.connect(target) {
        debug!("No outbound route via {target}: {e}");
        return None;
    }
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}
