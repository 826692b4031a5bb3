use std::fmt;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// An IPv4 or IPv6 socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(SocketAddr);

impl Address {
    /// Build from a literal IP address (`"127.0.0.1"`, `"::1"`) and a port.
    ///
    /// Host names are not resolved here; see [`Address::resolve`].
    pub fn new(ip: &str, port: u16) -> Result<Self> {
        let ip = IpAddr::from_str(ip)
            .map_err(|_| TransportError::InvalidAddress(format!("{ip} (port {port})")))?;
        Ok(Self(SocketAddr::new(ip, port)))
    }

    /// Parse `ip:port` or `[ipv6]:port`.
    pub fn parse(text: &str) -> Result<Self> {
        SocketAddr::from_str(text)
            .map(Self)
            .map_err(|_| TransportError::InvalidAddress(text.to_string()))
    }

    /// Resolve `host:port` through the system resolver and take the first result.
    pub fn resolve(text: &str) -> Result<Self> {
        text.to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(Self)
            .ok_or_else(|| TransportError::InvalidAddress(text.to_string()))
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn set_port(&mut self, port: u16) {
        self.0.set_port(port);
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<Address> for SocketAddr {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl FromStr for Address {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
