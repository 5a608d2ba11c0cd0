use crate::error::{ProbeError, Result};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ProbeError::AddressResolution(format!("{}:{} ({})", host, port, e)))?
        .collect();

    if addrs.is_empty() {
        return Err(ProbeError::AddressResolution(format!("{}:{}", host, port)));
    }

    Ok(addrs)
}

/// Check whether something is accepting TCP connections on `host:port`.
/// Only connects; nothing is sent over the socket.
pub fn is_port_open(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs = match resolve(host, port) {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("{}", e);
            return false;
        }
    };

    addrs.iter().any(|addr| match TcpStream::connect_timeout(addr, timeout) {
        Ok(_) => true,
        Err(e) => {
            debug!("Connect to {} failed: {}", addr, e);
            false
        }
    })
}
