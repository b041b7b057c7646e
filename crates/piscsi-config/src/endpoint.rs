use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host and port of the control server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ControlEndpoint {
    /// Host name or address literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ControlEndpoint {
    /// Builds an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolves the host to its first IPv4 socket address.
    ///
    /// The control protocol is IPv4 only, so IPv6 results are skipped.
    pub fn resolve_ipv4(&self) -> Result<SocketAddr, EndpointResolveError> {
        let addresses = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| EndpointResolveError::Lookup {
                host: self.host.clone(),
                source,
            })?;
        addresses
            .into_iter()
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| EndpointResolveError::NoIpv4Address {
                host: self.host.clone(),
            })
    }
}

impl fmt::Display for ControlEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ControlEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        if host.is_empty() {
            return Err(EndpointParseError::MissingHost(input.to_owned()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointParseError::InvalidPort(input.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

/// Errors encountered while parsing a [`ControlEndpoint`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointParseError {
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// Port was not a valid number.
    #[error("invalid port in '{0}'")]
    InvalidPort(String),
}

/// Errors raised while resolving a [`ControlEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointResolveError {
    /// Name resolution failed.
    #[error("can't resolve hostname '{host}': {source}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no IPv4 address.
    #[error("can't resolve hostname '{host}' to an IPv4 address")]
    NoIpv4Address { host: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_endpoint() {
        let endpoint = ControlEndpoint::new("raspberrypi", 6868);
        assert_eq!(endpoint.to_string(), "raspberrypi:6868");
    }

    #[test]
    fn parse_endpoint() {
        let endpoint: ControlEndpoint = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(endpoint, ControlEndpoint::new("127.0.0.1", 9000));
    }

    #[test]
    fn parse_rejects_missing_port() {
        let error = "localhost".parse::<ControlEndpoint>().unwrap_err();
        assert!(matches!(error, EndpointParseError::MissingPort(_)));
    }

    #[test]
    fn resolves_loopback_literal() {
        let address = ControlEndpoint::new("127.0.0.1", 6868)
            .resolve_ipv4()
            .expect("literal resolves");
        assert!(address.is_ipv4());
        assert_eq!(address.port(), 6868);
    }
}
