//! Normalizing command-line host arguments into a [`ConnectionTarget`].

use std::fmt;

use url::{Host, Url};

use crate::error::InputError;

/// Port used when neither the URL nor the caller names one.
pub const DEFAULT_PORT: u16 = 443;

/// A host and port to fetch a certificate chain from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    hostname: String,
    port: u16,
}

impl ConnectionTarget {
    pub fn new(hostname: &str, port: u16) -> Result<Self, InputError> {
        if hostname.is_empty() {
            return Err(InputError::MissingHostname);
        }
        Ok(ConnectionTarget {
            hostname: hostname.to_string(),
            port,
        })
    }

    /// Builds a target from the positional `HOST [PORT]` arguments.
    ///
    /// `host` may be a bare hostname or an `https://` URL. A port embedded in
    /// the URL is used unless `port` is given. `default_port` applies when
    /// neither names one.
    pub fn parse(host: &str, port: Option<&str>, default_port: u16) -> Result<Self, InputError> {
        let (hostname, url_port) = if host.starts_with("https://") {
            split_url(host)?
        } else {
            (host.to_string(), None)
        };

        let port = match port {
            Some(raw) => parse_port(raw)?,
            None => url_port.unwrap_or(default_port),
        };

        ConnectionTarget::new(&hostname, port)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.contains(':') {
            write!(f, "[{}]:{}", self.hostname, self.port)
        } else {
            write!(f, "{}:{}", self.hostname, self.port)
        }
    }
}

fn split_url(input: &str) -> Result<(String, Option<u16>), InputError> {
    let url = Url::parse(input).map_err(|e| InputError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })?;

    let hostname = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => {
            return Err(InputError::InvalidUrl {
                input: input.to_string(),
                reason: "URL has no host".to_string(),
            })
        }
    };

    // An explicit `:443` must win over a configured default port.
    Ok((hostname, url.port_or_known_default()))
}

fn parse_port(raw: &str) -> Result<u16, InputError> {
    match raw.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(InputError::InvalidPort {
            input: raw.to_string(),
        }),
    }
}
