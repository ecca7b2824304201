use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::policy::{dump_policy, find_overlaps, PolicyMap};
use crate::range::{PortRange, Protocol, RangeError};

/// `<type> <protocol> <port list>` as printed by `semanage port --noheading --list`.
static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(\S+)\s+(\S.*)$").expect("listing pattern is valid")
});

/// Errors that can occur while parsing a port listing.
///
/// Any error aborts the whole parse; no partial listing is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line does not have the `<type> <protocol> <ports>` shape.
    #[error("line {line}: not a port listing entry: {text:?}")]
    Malformed { line: usize, text: String },
    /// Protocol column is not a known protocol.
    #[error("line {line}: unknown protocol '{protocol}'")]
    UnknownProtocol { line: usize, protocol: String },
    /// A port token is not `N` or `N-M` within 1-65535.
    #[error("line {line}: {source}")]
    Range {
        line: usize,
        #[source]
        source: RangeError,
    },
    /// Port list column held no tokens.
    #[error("line {line}: no port numbers found in {text:?}")]
    NoPorts { line: usize, text: String },
    /// The same exact range was listed under two types.
    #[error("line {line}: duplicate types on same port ({range}): {existing} and {label}")]
    Ambiguous {
        line: usize,
        range: PortRange,
        existing: String,
        label: String,
    },
}

/// Parse a bare port list such as `22, 8008-8010` for one protocol.
///
/// Tokens are separated by commas and/or whitespace.
pub fn parse_port_list(text: &str, protocol: Protocol) -> Result<Vec<PortRange>, RangeError> {
    let ranges = tokens(text)
        .map(|token| PortRange::parse_spec(token, protocol))
        .collect::<Result<Vec<_>, _>>()?;
    if ranges.is_empty() {
        return Err(RangeError::InvalidToken(text.to_string()));
    }
    Ok(ranges)
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

/// Parse listing text into a map of range to type.
///
/// When `ignore` is given, any entry whose exact range maps to the same type in
/// `ignore` is dropped. Passing the local policy here turns the full listing into the
/// default-only residue. Adjacent ranges are not coalesced and nested ranges are kept.
pub fn parse_listing(text: &str, ignore: Option<&PolicyMap>) -> Result<PolicyMap, ParseError> {
    let mut policy = PolicyMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let caps = LIST_LINE.captures(raw).ok_or_else(|| ParseError::Malformed {
            line,
            text: raw.to_string(),
        })?;
        let label = &caps[1];
        let protocol: Protocol = caps[2]
            .parse()
            .map_err(|_| ParseError::UnknownProtocol {
                line,
                protocol: caps[2].to_string(),
            })?;

        let mut found = false;
        for token in tokens(&caps[3]) {
            found = true;
            let range = PortRange::parse_spec(token, protocol)
                .map_err(|source| ParseError::Range { line, source })?;

            if ignore.and_then(|ignore| ignore.get(&range)) == Some(label) {
                continue;
            }
            match policy.get(&range) {
                Some(existing) if existing != label => {
                    return Err(ParseError::Ambiguous {
                        line,
                        range,
                        existing: existing.to_string(),
                        label: label.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    policy.insert(range, label);
                }
            }
        }
        if !found {
            return Err(ParseError::NoPorts {
                line,
                text: raw.to_string(),
            });
        }
    }

    Ok(policy)
}

/// Parse `semanage port --noheading --list --locallist` output.
///
/// `semanage` accepts local entries that overlap without being identical; they are
/// kept as listed and reported with a warning.
pub fn parse_local_policy(text: &str) -> Result<PolicyMap, ParseError> {
    let local = parse_listing(text, None)?;
    tracing::trace!("{}", dump_policy("Local Policy:", &local));
    let overlaps = find_overlaps(local.ranges());
    if !overlaps.is_empty() {
        tracing::warn!(?overlaps, "local port policy has overlapping entries");
    }
    Ok(local)
}

/// Parse the full `semanage port --noheading --list` output, minus `local`.
///
/// The result may contain nested ranges.
pub fn parse_default_policy(text: &str, local: &PolicyMap) -> Result<PolicyMap, ParseError> {
    let default = parse_listing(text, Some(local))?;
    tracing::trace!("{}", dump_policy("Default Policy:", &default));
    Ok(default)
}
