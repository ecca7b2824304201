use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest port number a range may start at.
pub const MIN_PORT: u16 = 1;
/// Highest port number a range may end at.
pub const MAX_PORT: u16 = 65535;

/// Transport protocols that carry port labels.
///
/// Variant order is part of the [`PortRange`] total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Every supported protocol, in canonical order.
    pub const ALL: [Protocol; 3] = [Protocol::Tcp, Protocol::Udp, Protocol::Sctp];

    /// Lower-case name as used on the `semanage` command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|protocol| protocol.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RangeError::UnknownProtocol(s.to_string()))
    }
}

/// Errors raised when building or parsing a [`PortRange`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("port {0} is outside 1-65535")]
    OutOfBounds(u32),
    #[error("inverted port range: {from} > {to}")]
    Inverted { from: u16, to: u16 },
    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),
    #[error("invalid port token '{0}'")]
    InvalidToken(String),
}

/// An inclusive run of ports for one protocol.
///
/// Ordered by `from`, then `to`, then protocol. Overlay and conflict scans rely on this
/// order to stop as soon as an entry starts past the range of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortRange {
    from: u16,
    to: u16,
    protocol: Protocol,
}

impl PortRange {
    /// Build a range, enforcing `1 <= from <= to <= 65535`.
    pub fn new(from: u16, to: u16, protocol: Protocol) -> Result<Self, RangeError> {
        for port in [from, to] {
            if port < MIN_PORT {
                return Err(RangeError::OutOfBounds(u32::from(port)));
            }
        }
        if from > to {
            return Err(RangeError::Inverted { from, to });
        }
        Ok(Self { from, to, protocol })
    }

    /// A range covering exactly one port.
    pub fn single(port: u16, protocol: Protocol) -> Result<Self, RangeError> {
        Self::new(port, port, protocol)
    }

    pub fn from(&self) -> u16 {
        self.from
    }

    pub fn to(&self) -> u16 {
        self.to
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Number of ports covered.
    pub fn len(&self) -> u32 {
        u32::from(self.to) - u32::from(self.from) + 1
    }

    /// Ranges always hold at least one port.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains_port(&self, port: u16) -> bool {
        port >= self.from && port <= self.to
    }

    /// Whether both ranges share a protocol and at least one port.
    pub fn overlaps(&self, other: &PortRange) -> bool {
        self.protocol == other.protocol && self.from <= other.to && other.from <= self.to
    }

    /// Whether `other` starts on the port right after this range ends.
    pub fn is_followed_by(&self, other: &PortRange) -> bool {
        self.protocol == other.protocol && u32::from(self.to) + 1 == u32::from(other.from)
    }

    /// The part of this range strictly below `port`, if any.
    pub fn split_below(&self, port: u16) -> Option<PortRange> {
        let to = self.to.min(port.checked_sub(1)?);
        (to >= self.from).then_some(PortRange { to, ..*self })
    }

    /// The part of this range strictly above `port`, if any.
    pub fn split_above(&self, port: u16) -> Option<PortRange> {
        let from = self.from.max(port.checked_add(1)?);
        (from <= self.to).then_some(PortRange { from, ..*self })
    }

    /// Span from this range's start to the end of `other`.
    ///
    /// Callers guarantee `other` does not end before `self` starts.
    pub(crate) fn extend_to(&self, other: &PortRange) -> PortRange {
        debug_assert_eq!(self.protocol, other.protocol);
        debug_assert!(self.from <= other.to);
        PortRange {
            to: other.to,
            ..*self
        }
    }

    /// Port part in the form `semanage` expects: `80` or `8008-8010`.
    pub fn port_spec(&self) -> String {
        if self.from == self.to {
            self.from.to_string()
        } else {
            format!("{}-{}", self.from, self.to)
        }
    }

    /// Parse `N` or `N-M` for the given protocol.
    pub fn parse_spec(token: &str, protocol: Protocol) -> Result<Self, RangeError> {
        let (from, to) = match token.split_once('-') {
            Some((from, to)) => (parse_port(from, token)?, parse_port(to, token)?),
            None => {
                let port = parse_port(token, token)?;
                (port, port)
            }
        };
        Self::new(from, to, protocol)
    }
}

fn parse_port(raw: &str, token: &str) -> Result<u16, RangeError> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| RangeError::InvalidToken(token.to_string()))?;
    u16::try_from(value)
        .ok()
        .filter(|port| *port >= MIN_PORT)
        .ok_or(RangeError::OutOfBounds(value))
}

impl Ord for PortRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.from
            .cmp(&other.from)
            .then_with(|| self.to.cmp(&other.to))
            .then_with(|| self.protocol.cmp(&other.protocol))
    }
}

impl PartialOrd for PortRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Widest range first; equal widths fall back to the canonical order.
///
/// Default policy is laid down in this order so that narrower entries punch through
/// the broader bands they sit inside.
pub fn span_descending(a: &PortRange, b: &PortRange) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| a.cmp(b))
}

impl Display for PortRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port_spec(), self.protocol)
    }
}

impl FromStr for PortRange {
    type Err = RangeError;

    /// Accepts `80/tcp` or `8008-8010/udp`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ports, protocol) = s
            .trim()
            .rsplit_once('/')
            .ok_or_else(|| RangeError::InvalidToken(s.to_string()))?;
        PortRange::parse_spec(ports, protocol.parse()?)
    }
}

impl<'de> Deserialize<'de> for PortRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            from: u16,
            to: u16,
            protocol: Protocol,
        }

        let raw = Raw::deserialize(deserializer)?;
        PortRange::new(raw.from, raw.to, raw.protocol).map_err(serde::de::Error::custom)
    }
}
