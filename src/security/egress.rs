//! Outbound request policy (SSRF protection).
//!
//! # Responsibilities
//! - Accept only absolute http(s) URLs with a host
//! - Reject loopback, private, link-local and other non-public destinations
//! - Re-check resolved addresses at connect time and on every redirect
//!
//! # Design Decisions
//! - Literal hosts are checked during input validation, before any I/O
//! - DNS answers are filtered by [`GuardedResolver`], so a public name that
//!   resolves to an internal address never gets a socket

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EgressViolation {
    #[error("must be a valid absolute URL")]
    InvalidUrl,

    #[error("scheme '{0}' is not allowed, use http or https")]
    UnsupportedScheme(String),

    #[error("URL must include a host")]
    MissingHost,

    #[error("host '{0}' is not allowed")]
    BlockedHost(String),

    #[error("address {0} is not publicly routable")]
    ForbiddenAddress(IpAddr),
}

/// Destination rules for server-initiated fetches.
#[derive(Debug, Clone, Copy, Default)]
pub struct EgressPolicy {
    allow_private: bool,
}

impl EgressPolicy {
    pub fn new(allow_private: bool) -> Self {
        Self { allow_private }
    }

    /// Parse `raw` and check its scheme and literal host.
    pub fn check_url(&self, raw: &str) -> Result<Url, EgressViolation> {
        let url = Url::parse(raw.trim()).map_err(|_| EgressViolation::InvalidUrl)?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(EgressViolation::UnsupportedScheme(other.to_string())),
        }

        if self.allow_private {
            return match url.host() {
                Some(_) => Ok(url),
                None => Err(EgressViolation::MissingHost),
            };
        }

        match url.host() {
            None => Err(EgressViolation::MissingHost),
            Some(Host::Domain(domain)) => {
                let name = domain.trim_end_matches('.').to_ascii_lowercase();
                if name.is_empty() || is_blocked_hostname(&name) {
                    return Err(EgressViolation::BlockedHost(name));
                }
                // Some resolvers accept IP literals that the URL parser left as a domain.
                if let Ok(ip) = name.parse::<IpAddr>() {
                    self.check_ip(ip)?;
                }
                Ok(url)
            }
            Some(Host::Ipv4(ip)) => self.check_ip(IpAddr::V4(ip)).map(|_| url),
            Some(Host::Ipv6(ip)) => self.check_ip(IpAddr::V6(ip)).map(|_| url),
        }
    }

    pub fn check_ip(&self, ip: IpAddr) -> Result<(), EgressViolation> {
        if !self.allow_private && is_forbidden_ip(ip) {
            return Err(EgressViolation::ForbiddenAddress(ip));
        }
        Ok(())
    }

    /// Redirect policy that re-applies [`EgressPolicy::check_url`] to every hop.
    pub fn redirect_policy(self, max_redirects: usize) -> redirect::Policy {
        redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                return attempt.error("too many redirects");
            }
            match self.check_url(attempt.url().as_str()) {
                Ok(_) => attempt.follow(),
                Err(violation) => {
                    tracing::warn!(target_url = %attempt.url(), error = %violation, "Blocked redirect");
                    attempt.error(violation)
                }
            }
        })
    }
}

fn is_blocked_hostname(name: &str) -> bool {
    name == "localhost"
        || name.ends_with(".localhost")
        || name == "local"
        || name.ends_with(".local")
        || name.starts_with('.')
}

/// True for any address a public fetch must never reach.
pub fn is_forbidden_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => is_forbidden_v6(v6),
    }
}

fn is_forbidden_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_forbidden_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_forbidden_v4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

/// DNS resolver that drops forbidden answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardedResolver {
    policy: EgressPolicy,
}

impl GuardedResolver {
    pub fn new(policy: EgressPolicy) -> Self {
        Self { policy }
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(self.policy, name.as_str().to_string()))
    }
}

async fn resolve_public(
    policy: EgressPolicy,
    host: String,
) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let allowed: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .filter(|addr| policy.check_ip(addr.ip()).is_ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!(host = %host, "Every resolved address is forbidden");
        return Err(Box::new(EgressViolation::BlockedHost(host)));
    }

    Ok(Box::new(allowed.into_iter()))
}
