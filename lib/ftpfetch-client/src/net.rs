/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Host {
    Ip(IpAddr),
    Domain(String),
}

impl Host {
    fn from_maybe_mapped_ip6(ip6: Ipv6Addr) -> Self {
        match ip6.to_ipv4_mapped() {
            Some(ip4) => Host::Ip(IpAddr::V4(ip4)),
            None => Host::Ip(IpAddr::V6(ip6)),
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ip(IpAddr::V6(ip6)) => write!(f, "[{ip6}]"),
            Host::Ip(ip) => write!(f, "{ip}"),
            Host::Domain(domain) => f.write_str(domain),
        }
    }
}

impl FromStr for Host {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(anyhow!("empty string"));
        }
        if let Some(inner) = s.strip_prefix('[') {
            return match inner.strip_suffix(']').map(Ipv6Addr::from_str) {
                Some(Ok(ip6)) => Ok(Host::from_maybe_mapped_ip6(ip6)),
                _ => Err(anyhow!("invalid ipv6 ip in squared brackets")),
            };
        }
        match IpAddr::from_str(s) {
            Ok(IpAddr::V6(ip6)) => Ok(Host::from_maybe_mapped_ip6(ip6)),
            Ok(ip) => Ok(Host::Ip(ip)),
            Err(_) => {
                if s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b'_')
                {
                    Ok(Host::Domain(s.to_ascii_lowercase()))
                } else {
                    Err(anyhow!("invalid domain name {s}"))
                }
            }
        }
    }
}

/// A server address which may still need to be resolved.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct UpstreamAddr {
    host: Host,
    port: u16,
}

impl UpstreamAddr {
    pub fn new(host: Host, port: u16) -> Self {
        UpstreamAddr { host, port }
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

impl From<SocketAddr> for UpstreamAddr {
    fn from(addr: SocketAddr) -> Self {
        UpstreamAddr::new(Host::Ip(addr.ip()), addr.port())
    }
}

impl fmt::Display for UpstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parse `host`, `host:port`, `[ipv6]` or `[ipv6]:port`. A missing port is set to 0.
impl FromStr for UpstreamAddr {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = SocketAddr::from_str(s) {
            return Ok(UpstreamAddr::from(addr));
        }
        if let Ok(ip6) = Ipv6Addr::from_str(s) {
            return Ok(UpstreamAddr::new(Host::from_maybe_mapped_ip6(ip6), 0));
        }

        let (host, port) = match s.rfind(':') {
            Some(i) if !s[..i].ends_with(':') && !s[i..].contains(']') => {
                let port = u16::from_str(&s[i + 1..]).map_err(|e| anyhow!("invalid port: {e}"))?;
                (&s[..i], port)
            }
            _ => (s, 0),
        };
        let host = Host::from_str(host)?;
        Ok(UpstreamAddr::new(host, port))
    }
}
