//! Client identity for rate limiting.
//!
//! # Design Decisions
//! - Forwarded headers are ignored unless the deployment says a trusted proxy sits in front
//! - Extraction never fails: unresolvable clients share the "unknown" bucket

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

/// Opaque rate-limit key for one client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for Fingerprint {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

/// Derives a [`Fingerprint`] from connection metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintExtractor {
    trust_forwarded: bool,
}

impl FingerprintExtractor {
    pub fn new(trust_forwarded: bool) -> Self {
        Self { trust_forwarded }
    }

    pub fn extract(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Fingerprint {
        if self.trust_forwarded {
            if let Some(ip) = forwarded_client(headers) {
                return ip.into();
            }
        }

        match peer {
            Some(addr) => addr.ip().into(),
            None => Fingerprint::unknown(),
        }
    }
}

/// First parsable address from X-Forwarded-For, then X-Real-IP.
fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let from_chain = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    from_chain.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    })
}
