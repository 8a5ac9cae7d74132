// SPDX-License-Identifier: MIT OR Apache-2.0

//! Node-attributed hybrid logical clock values.
//!
//! The engine generates timestamps; the store only parses, compares and orders them. The canonical
//! string form is designed so that plain lexicographic comparison equals the logical ordering,
//! which lets SQLite sort the fragment log with a simple `ORDER BY timestamp ASC`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Identifier of a replica (node) participating in a collaborative document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Totally-ordered, node-attributed logical clock value.
///
/// A timestamp combines a wall-clock reading in milliseconds, a logical counter for events within
/// the same millisecond, and the identifier of the node which produced it. The node id doubles as
/// the final tie-breaker and as the origin marker used for replica exclusion during sync.
///
/// The canonical string form is `{millis:013}-{counter:04x}-{node}`. Both numeric components are
/// fixed-width and zero-padded, so lexicographic order on the string matches the `(millis,
/// counter, node)` ordering of the struct. The derived `Ord` relies on exactly that field order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: u64,
    counter: u16,
    node_id: NodeId,
}

impl Timestamp {
    pub fn new(millis: u64, counter: u16, node_id: NodeId) -> Self {
        Self {
            millis,
            counter,
            node_id,
        }
    }

    /// Wall-clock component in milliseconds since the UNIX epoch.
    pub fn millis(&self) -> u64 {
        self.millis
    }

    /// Logical counter distinguishing events within the same millisecond.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Node which produced this timestamp.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:013}-{:04x}-{}",
            self.millis, self.counter, self.node_id
        )
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Node ids may themselves contain dashes, only the first two separators are structural.
        let mut parts = value.splitn(3, '-');

        let millis = parts
            .next()
            .filter(|part| part.len() == 13)
            .ok_or_else(|| TimestampError::InvalidFormat(value.to_string()))?
            .parse()
            .map_err(|_| TimestampError::InvalidFormat(value.to_string()))?;

        let counter_part = parts
            .next()
            .filter(|part| part.len() == 4)
            .ok_or_else(|| TimestampError::InvalidFormat(value.to_string()))?;
        let counter = u16::from_str_radix(counter_part, 16)
            .map_err(|_| TimestampError::InvalidFormat(value.to_string()))?;

        let node_id = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| TimestampError::InvalidFormat(value.to_string()))?;

        Ok(Self {
            millis,
            counter,
            node_id: NodeId::new(node_id),
        })
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum TimestampError {
    /// The string is not in `{millis:013}-{counter:04x}-{node}` form.
    #[error("invalid timestamp string '{0}'")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::{NodeId, Timestamp};

    #[test]
    fn canonical_string_round_trip() {
        let timestamp = Timestamp::new(1718409600000, 42, NodeId::new("node-a"));
        let value = timestamp.to_string();
        assert_eq!(value, "1718409600000-002a-node-a");

        let parsed: Timestamp = value.parse().unwrap();
        assert_eq!(parsed, timestamp);
        assert_eq!(parsed.node_id(), &NodeId::new("node-a"));
    }

    #[test]
    fn lexicographic_order_matches_logical_order() {
        let timestamps = [
            Timestamp::new(9, 0, NodeId::new("z")),
            Timestamp::new(10, 0, NodeId::new("a")),
            Timestamp::new(10, 1, NodeId::new("a")),
            Timestamp::new(10, 1, NodeId::new("b")),
            Timestamp::new(11, 0, NodeId::new("a")),
        ];

        for pair in timestamps.windows(2) {
            assert!(pair[0] < pair[1]);
            // The string form must sort the same way as the struct.
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("".parse::<Timestamp>().is_err());
        assert!("123-002a-node".parse::<Timestamp>().is_err());
        assert!("1718409600000-2a-node".parse::<Timestamp>().is_err());
        assert!("1718409600000-002a-".parse::<Timestamp>().is_err());
        assert!("171840960000x-002a-node".parse::<Timestamp>().is_err());
    }
}
