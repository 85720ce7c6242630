//! Family-aware IP endpoint value type.
//!
//! `IpAddress` wraps a socket endpoint (address + port) the way the rest of
//! the corephone core expects to see it: parsed leniently from whatever a
//! signalling layer or a UPnP response hands back, never panicking on
//! malformed input. A failed parse simply yields an `Unspecified` value,
//! which is "falsy" (see [`IpAddress::is_defined`]).
//!
//! # Examples
//!
//! ```rust
//! use corephone_ipaddr::IpAddress;
//!
//! let addr = IpAddress::parse("192.168.1.10:5060").unwrap();
//! assert!(addr.is_defined());
//! assert_eq!(addr.to_display_string(true, false), "192.168.1.10:5060");
//!
//! let v6 = IpAddress::parse("[::1]:5061").unwrap();
//! assert_eq!(v6.to_display_string(true, false), "[::1]:5061");
//!
//! let bogus = IpAddress::parse("not-an-address");
//! assert!(bogus.is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address family of an [`IpAddress`].
///
/// Only `V4` and `V6` are *defined*; `Unspecified` is the family of a
/// default-constructed or failed-to-parse value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// No address family could be determined.
    Unspecified,
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

/// A family-aware endpoint: an address plus a port.
///
/// This is the value type every other component in the core uses to talk
/// about "where on the network" something is — a candidate's transport
/// address, a UPnP-mapped external endpoint, a registrar's published
/// address. It never panics: malformed input just produces an
/// `Unspecified`, falsy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpAddress {
    family: Family,
    addr: IpAddr,
    port: u16,
}

impl Default for IpAddress {
    fn default() -> Self {
        Self {
            family: Family::Unspecified,
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
        }
    }
}

impl IpAddress {
    /// Construct directly from a [`SocketAddr`]; always defined.
    pub fn from_socket_addr(sock: SocketAddr) -> Self {
        let family = match sock {
            SocketAddr::V4(_) => Family::V4,
            SocketAddr::V6(_) => Family::V6,
        };
        Self {
            family,
            addr: sock.ip(),
            port: sock.port(),
        }
    }

    /// Construct from a bare [`IpAddr`] and a port.
    pub fn from_ip(addr: IpAddr, port: u16) -> Self {
        let family = match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        };
        Self { family, addr, port }
    }

    /// Parse a v4-or-v6 string in any of the forms the core encounters:
    /// `"1.2.3.4"`, `"1.2.3.4:5060"`, `"::1"`, `"[::1]:5060"`, or a bare
    /// `"host:port"` where `host` parses as an IP literal. Anything else
    /// returns `None` rather than an `Unspecified` value, so callers can
    /// choose between "use the default" and "log and skip".
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        // Bracketed IPv6 with optional port: "[::1]:5060" or "[::1]"
        if let Some(rest) = input.strip_prefix('[') {
            let close = rest.find(']')?;
            let (addr_part, after) = rest.split_at(close);
            let addr: Ipv6Addr = addr_part.parse().ok()?;
            let after = &after[1..]; // drop ']'
            let port = if let Some(p) = after.strip_prefix(':') {
                p.parse().ok()?
            } else {
                0
            };
            return Some(Self {
                family: Family::V6,
                addr: IpAddr::V6(addr),
                port,
            });
        }

        // Bare IPv6 without brackets (no port, since ':' is ambiguous)
        if input.matches(':').count() > 1 {
            let addr: Ipv6Addr = input.parse().ok()?;
            return Some(Self {
                family: Family::V6,
                addr: IpAddr::V6(addr),
                port: 0,
            });
        }

        // "host:port" form where host is a v4 literal
        if let Some((host, port_str)) = input.rsplit_once(':') {
            if let Ok(addr) = host.parse::<Ipv4Addr>() {
                let port: u16 = port_str.parse().ok()?;
                return Some(Self {
                    family: Family::V4,
                    addr: IpAddr::V4(addr),
                    port,
                });
            }
            return None;
        }

        // Bare v4 literal, no port
        let addr: Ipv4Addr = input.parse().ok()?;
        Some(Self {
            family: Family::V4,
            addr: IpAddr::V4(addr),
            port: 0,
        })
    }

    /// The address family.
    pub fn family(&self) -> Family {
        self.family
    }

    /// `true` iff the family is `V4` or `V6` — i.e. this value came from a
    /// successful parse or explicit construction, not the default.
    pub fn is_defined(&self) -> bool {
        matches!(self.family, Family::V4 | Family::V6)
    }

    /// Current port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Replace the port in place.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// The raw [`IpAddr`], regardless of family.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Render as a [`SocketAddr`] (port defaults to 0 if unset).
    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    /// Format as text. `include_port` controls whether `:port` is
    /// appended; `force_ipv6_brackets` forces `[addr]` even when
    /// `include_port` is false (useful for SDP candidate lines that always
    /// bracket IPv6 literals). An IPv6 address with a port is *always*
    /// bracketed regardless of `force_ipv6_brackets`, since `addr:port`
    /// would otherwise be ambiguous with the address's own colons.
    pub fn to_display_string(&self, include_port: bool, force_ipv6_brackets: bool) -> String {
        match self.family {
            Family::Unspecified => String::new(),
            Family::V4 => {
                if include_port {
                    format!("{}:{}", self.addr, self.port)
                } else {
                    self.addr.to_string()
                }
            }
            Family::V6 => {
                let bracket = force_ipv6_brackets || include_port;
                if include_port {
                    format!("[{}]:{}", self.addr, self.port)
                } else if bracket {
                    format!("[{}]", self.addr)
                } else {
                    self.addr.to_string()
                }
            }
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string(self.port != 0, false))
    }
}

impl From<SocketAddr> for IpAddress {
    fn from(sock: SocketAddr) -> Self {
        Self::from_socket_addr(sock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v4_with_port() {
        let a = IpAddress::parse("10.0.0.1:4000").unwrap();
        assert_eq!(a.family(), Family::V4);
        assert_eq!(a.port(), 4000);
        assert!(a.is_defined());
    }

    #[test]
    fn parses_v4_without_port() {
        let a = IpAddress::parse("10.0.0.1").unwrap();
        assert_eq!(a.port(), 0);
        assert_eq!(a.to_display_string(false, false), "10.0.0.1");
    }

    #[test]
    fn parses_bracketed_v6_with_port() {
        let a = IpAddress::parse("[2001:db8::1]:5061").unwrap();
        assert_eq!(a.family(), Family::V6);
        assert_eq!(a.port(), 5061);
        assert_eq!(a.to_display_string(true, false), "[2001:db8::1]:5061");
    }

    #[test]
    fn parses_bare_v6_no_port() {
        let a = IpAddress::parse("::1").unwrap();
        assert_eq!(a.family(), Family::V6);
        assert_eq!(a.port(), 0);
    }

    #[test]
    fn malformed_input_yields_none() {
        assert!(IpAddress::parse("").is_none());
        assert!(IpAddress::parse("not an address").is_none());
        assert!(IpAddress::parse("999.999.999.999").is_none());
    }

    #[test]
    fn default_is_unspecified_and_falsy() {
        let a = IpAddress::default();
        assert_eq!(a.family(), Family::Unspecified);
        assert!(!a.is_defined());
        assert_eq!(a.to_display_string(true, false), "");
    }

    #[test]
    fn round_trips_through_display() {
        for s in ["1.2.3.4:80", "[::1]:80"] {
            let a = IpAddress::parse(s).unwrap();
            assert_eq!(a.to_display_string(true, false), s);
        }
    }

    #[test]
    fn serde_round_trip() {
        let a = IpAddress::parse("1.2.3.4:80").unwrap();
        let json = serde_json::to_string(&a).unwrap();
        let back: IpAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
