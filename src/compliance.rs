// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Compliance Filter
//!
//! Static sanctions screening of transaction senders. Two lists are kept:
//! the general list and a jurisdiction-specific list that operators may
//! extend through `EXTRA_SANCTIONED_ADDRESSES`. A hit on either list blocks
//! the call before anything else happens.

use std::collections::HashSet;

use alloy::primitives::{address, Address};

const GENERAL_SANCTIONS: &[Address] = &[
    address!("0x8589427373d6d84e98730d7795d8f6f8731fda16"),
    address!("0x722122df12d4e14e13ac3b6895a86e84145b6967"),
    address!("0xdd4c48c0b24039969fc16d1cdf626eab821d3384"),
    address!("0xd90e2f925da726b50c4ed8d0fb90ad053324f31b"),
    address!("0xd96f2b1c14db8458374d9aca76e26c3d18364307"),
    address!("0x4736dcf1b7a3d580672cce6e7c65cd5cc9cfba9d"),
    address!("0xd4b88df4d29f5cedd6857912842cff3b20c8cfa3"),
    address!("0x910cbd523d972eb0a6f4cae4618ad62622b39dbf"),
    address!("0xa160cdab225685da1d56aa342ad8841c3b53f291"),
    address!("0xfd8610d20aa15b7b2e3be39b396a1bc3516c7144"),
    address!("0x07687e702b410fa43f4cb4af7fa097918ffd2730"),
    address!("0x23773e65ed146a459791799d01336db287f25334"),
    address!("0x12d66f87a04a9e220743712ce6d9bb1b5616b8fc"),
    address!("0x47ce0c6ed5b0ce3d3a51fdb1c52dc66a7c3c2936"),
];

const JURISDICTIONAL_SANCTIONS: &[Address] = &[
    address!("0x098b716b8aaf21512996dc57eb0615e2383e2f96"),
    address!("0xa0e1c89ef1a489c9c7de96311ed5ce5d32c20e4b"),
    address!("0x3cffd56b47b7b41c56258d9c7731abadc360e073"),
    address!("0x53b6936513e738f44fb50d2b9476730c0ab3bfc1"),
];

#[derive(Debug, Clone)]
pub struct ComplianceFilter {
    general: HashSet<Address>,
    jurisdictional: HashSet<Address>,
}

impl Default for ComplianceFilter {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl ComplianceFilter {
    /// Built-in lists plus operator-supplied jurisdictional additions.
    pub fn new(extra_jurisdictional: impl IntoIterator<Item = Address>) -> Self {
        let mut jurisdictional: HashSet<Address> =
            JURISDICTIONAL_SANCTIONS.iter().copied().collect();
        jurisdictional.extend(extra_jurisdictional);

        Self {
            general: GENERAL_SANCTIONS.iter().copied().collect(),
            jurisdictional,
        }
    }

    /// `Address` equality is byte-wise, so checksum casing never matters.
    pub fn is_blocked(&self, sender: &Address) -> bool {
        self.general.contains(sender) || self.jurisdictional.contains(sender)
    }
}
