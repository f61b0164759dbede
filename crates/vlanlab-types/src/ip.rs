//! IPv4 prefix type with subnet arithmetic.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 subnet in CIDR notation (e.g., `172.16.1.64/26`).
///
/// The address is always the network address: host bits must be zero.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use vlanlab_types::Ipv4Prefix;
///
/// let subnet: Ipv4Prefix = "172.16.1.64/26".parse().unwrap();
/// assert_eq!(subnet.netmask(), Ipv4Addr::new(255, 255, 255, 192));
/// assert!(subnet.contains(Ipv4Addr::new(172, 16, 1, 66)));
/// assert!(!subnet.contains(Ipv4Addr::new(172, 16, 1, 130)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Prefix {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Prefix {
    /// Creates a new prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length exceeds 32 or if `network` has
    /// host bits set for the given length.
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Result<Self, ParseError> {
        if prefix_len > 32 {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds maximum 32",
                prefix_len
            )));
        }

        let bits = u32::from(network);
        if bits & !mask_bits(prefix_len) != 0 {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{} has host bits set",
                network, prefix_len
            )));
        }

        Ok(Ipv4Prefix {
            network,
            prefix_len,
        })
    }

    /// Returns the network address of this prefix.
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the dotted-quad netmask (`255.255.255.192` for a /26).
    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(mask_bits(self.prefix_len))
    }

    /// Returns the directed broadcast address.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !mask_bits(self.prefix_len))
    }

    /// Returns true if `addr` lies inside this prefix.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask_bits(self.prefix_len) == u32::from(self.network)
    }

    /// Returns true if `addr` is usable as a host address, i.e. inside the
    /// prefix and neither the network nor the broadcast address.
    ///
    /// /31 and /32 prefixes have no reserved addresses.
    pub fn is_host_address(&self, addr: Ipv4Addr) -> bool {
        if !self.contains(addr) {
            return false;
        }
        if self.prefix_len >= 31 {
            return true;
        }
        addr != self.network && addr != self.broadcast()
    }

    /// Returns true if the two prefixes share at least one address.
    pub fn overlaps(&self, other: &Ipv4Prefix) -> bool {
        let shorter = self.prefix_len.min(other.prefix_len);
        let mask = mask_bits(shorter);
        u32::from(self.network) & mask == u32::from(other.network) & mask
    }
}

fn mask_bits(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

        let network: Ipv4Addr = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        Ipv4Prefix::new(network, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Prefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Ipv4Prefix> for String {
    fn from(prefix: Ipv4Prefix) -> String {
        prefix.to_string()
    }
}
