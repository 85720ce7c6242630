//! ICE candidates and the bit-exact wire format used to exchange them
//! out-of-band (§4.K.4, §6).

use corephone_ipaddr::IpAddress;

use crate::error::IceError;

/// The kind of transport address a [`Candidate`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateType {
    /// A local interface address.
    Host,
    /// A server-reflexive address (as seen from outside a NAT — here,
    /// discovered via UPnP rather than a STUN binding request).
    ServerReflexive,
    /// A relayed address (TURN-style). Never produced by this core; kept
    /// so the wire format and parser round-trip it if a peer sends one.
    Relay,
}

impl CandidateType {
    fn as_wire_str(self) -> &'static str {
        match self {
            CandidateType::Host => "host",
            CandidateType::ServerReflexive => "srflx",
            CandidateType::Relay => "relay",
        }
    }

    fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "host" => Some(CandidateType::Host),
            "srflx" => Some(CandidateType::ServerReflexive),
            "relay" => Some(CandidateType::Relay),
            _ => None,
        }
    }
}

/// One `(transport-address, type)` pair offered during ICE negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Foundation: candidates sharing a foundation are believed to have
    /// the same connectivity characteristics. This core assigns one
    /// foundation per gathered candidate base, which is sufficient for
    /// single-homed hosts.
    pub foundation: String,
    /// Component id this candidate belongs to (1-based, matching the
    /// wire format; `IceSocket`/transport APIs elsewhere in this crate
    /// are 0-based and convert at the boundary).
    pub component: u32,
    /// Priority; higher is preferred. Host candidates outrank
    /// server-reflexive ones, matching RFC 8445's recommended formula
    /// at a coarse grain (exact tie-breaking is not load-bearing here,
    /// since this core does not run real connectivity checks — see
    /// [`crate::transport`] module docs).
    pub priority: u32,
    /// The transport address itself.
    pub address: IpAddress,
    /// Host, server-reflexive, or relay.
    pub candidate_type: CandidateType,
}

impl Candidate {
    /// Render as one line of the bit-exact format:
    /// `%s %d UDP %d %s %d typ %s`.
    pub fn to_line(&self) -> String {
        format!(
            "{} {} UDP {} {} {} typ {}",
            self.foundation,
            self.component,
            self.priority,
            self.address.addr(),
            self.address.port(),
            self.candidate_type.as_wire_str(),
        )
    }

    /// Parse one candidate line, rejecting anything that doesn't match
    /// the 7-field `sscanf`-equivalent shape or carries an unrecognised
    /// `typ` token.
    pub fn parse_line(line: &str) -> std::result::Result<Self, IceError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(IceError::InvalidCandidate(line.to_string()));
        }
        let [foundation, component, proto, priority, ip, port, rest @ ..] = fields.as_slice()
        else {
            return Err(IceError::InvalidCandidate(line.to_string()));
        };
        if !proto.eq_ignore_ascii_case("UDP") {
            return Err(IceError::InvalidCandidate(line.to_string()));
        }
        // rest is ["typ", "<type>"] given the length-7 check above.
        if rest.len() != 2 || rest[0] != "typ" {
            return Err(IceError::InvalidCandidate(line.to_string()));
        }
        let candidate_type = CandidateType::from_wire_str(rest[1])
            .ok_or_else(|| IceError::InvalidCandidate(line.to_string()))?;
        let component: u32 = component
            .parse()
            .map_err(|_| IceError::InvalidCandidate(line.to_string()))?;
        let priority: u32 = priority
            .parse()
            .map_err(|_| IceError::InvalidCandidate(line.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| IceError::InvalidCandidate(line.to_string()))?;
        let ip: std::net::IpAddr = ip
            .parse()
            .map_err(|_| IceError::InvalidCandidate(line.to_string()))?;

        Ok(Self {
            foundation: foundation.to_string(),
            component,
            priority,
            address: IpAddress::from_ip(ip, port),
            candidate_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candidate {
        Candidate {
            foundation: "f1".to_string(),
            component: 1,
            priority: 2_130_706_431,
            address: IpAddress::from_ip("192.168.1.10".parse().unwrap(), 40000),
            candidate_type: CandidateType::Host,
        }
    }

    #[test]
    fn round_trips_through_line_format() {
        let c = sample();
        let line = c.to_line();
        assert_eq!(line, "f1 1 UDP 2130706431 192.168.1.10 40000 typ host");
        let parsed = Candidate::parse_line(&line).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(Candidate::parse_line("f1 1 UDP 1 1.2.3.4 4000").is_err());
    }

    #[test]
    fn rejects_unknown_type_token() {
        assert!(
            Candidate::parse_line("f1 1 UDP 1 1.2.3.4 4000 typ bogus").is_err()
        );
    }

    #[test]
    fn rejects_non_udp_protocol() {
        assert!(
            Candidate::parse_line("f1 1 TCP 1 1.2.3.4 4000 typ host").is_err()
        );
    }
}
