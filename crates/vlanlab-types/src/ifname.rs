//! Linux network interface names.

use crate::{ParseError, VlanId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated Linux network interface name (`h1-eth0`, `h1-eth0.10`).
///
/// The kernel limits names to 15 bytes (`IFNAMSIZ - 1`). Only ASCII
/// alphanumerics, `-`, `_` and `.` are accepted, which also keeps names
/// safe to pass as command arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IfName(String);

impl IfName {
    /// Maximum interface name length in bytes.
    pub const MAX_LEN: usize = 15;

    /// Creates a new interface name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, longer than 15 bytes, contains
    /// characters outside `[A-Za-z0-9_.-]`, or is `.`/`..`.
    pub fn new(name: impl Into<String>) -> Result<Self, ParseError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty".to_string())
        } else if name.len() > Self::MAX_LEN {
            Some(format!(
                "{} bytes exceeds the {} byte kernel limit",
                name.len(),
                Self::MAX_LEN
            ))
        } else if name == "." || name == ".." {
            Some("reserved name".to_string())
        } else if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            Some(format!("invalid character {:?}", c))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ParseError::InvalidInterfaceName { name, reason }),
            None => Ok(IfName(name)),
        }
    }

    /// Returns the name of the VLAN sub-interface of this interface
    /// (`h1-eth0` + VLAN 10 → `h1-eth0.10`).
    pub fn vlan_subinterface(&self, vlan: VlanId) -> Result<IfName, ParseError> {
        IfName::new(format!("{}.{}", self.0, vlan))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IfName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IfName {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        IfName::new(s)
    }
}

impl From<IfName> for String {
    fn from(name: IfName) -> String {
        name.0
    }
}
