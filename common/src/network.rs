// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AddressError {
    /// Raw addresses are either 4 or 16 octets
    #[error("bad binary address {0:?}")]
    BadLength(Vec<u8>),
    #[error("illegal IP address string: {0}")]
    BadString(String),
}

/// Convert a raw address in network byte order into an `IpAddr`.
pub fn ip_ntop(addr: &[u8]) -> Result<IpAddr, AddressError> {
    if let Ok(a) = <[u8; 4]>::try_from(addr) {
        Ok(IpAddr::V4(Ipv4Addr::from(a)))
    } else if let Ok(a) = <[u8; 16]>::try_from(addr) {
        Ok(IpAddr::V6(Ipv6Addr::from(a)))
    } else {
        Err(AddressError::BadLength(addr.to_vec()))
    }
}

/// Convert an address into its raw octets in network byte order.
pub fn ip_octets(addr: IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(a) => a.octets().to_vec(),
        IpAddr::V6(a) => a.octets().to_vec(),
    }
}

/// Parse an address string into its raw octets.
pub fn ip_pton(s: &str) -> Result<Vec<u8>, AddressError> {
    s.parse::<IpAddr>()
        .map(ip_octets)
        .map_err(|_| AddressError::BadString(s.to_string()))
}

/// An EUI-48 MAC address, used for layer-2 addressing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MacAddr {
    a: [u8; 6],
}

impl MacAddr {
    /// The Organizationally Unique Identifier: the first three octets.
    pub fn oui(self) -> [u8; 3] {
        [self.a[0], self.a[1], self.a[2]]
    }
}

#[derive(Error, Debug, Clone)]
pub enum MacError {
    /// Too few octets to be a valid MAC address
    #[error("Too few octets")]
    TooShort,
    /// Too many octets to be a valid MAC address
    #[error("Too many octets")]
    TooLong,
    /// Found an octet with a non-hexadecimal character or invalid separator
    #[error("Invalid octect")]
    InvalidOctet,
}

impl FromStr for MacAddr {
    type Err = MacError;

    fn from_str(s: &str) -> Result<Self, MacError> {
        let v: Vec<&str> = s.split(':').collect();

        match v.len().cmp(&6) {
            std::cmp::Ordering::Less => Err(MacError::TooShort),
            std::cmp::Ordering::Greater => Err(MacError::TooLong),
            std::cmp::Ordering::Equal => {
                let mut m = MacAddr { a: [0u8; 6] };
                for (i, octet) in v.iter().enumerate() {
                    m.a[i] = u8::from_str_radix(octet, 16)
                        .map_err(|_| MacError::InvalidOctet)?;
                }
                Ok(m)
            }
        }
    }
}
