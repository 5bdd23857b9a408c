use crate::structure::entity_id::*;
use crate::structure::vendor_id::VendorId;
use alloc::fmt;
use rand::{self, rngs::SmallRng, Rng};
use serde::{Deserialize, Serialize};
use speedy::{Readable, Writable};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord, Hash)]
pub struct GUID {
    pub guid_prefix: GuidPrefix,
    pub entity_id: EntityId,
}

impl GUID {
    pub const UNKNOW: Self = Self {
        guid_prefix: GuidPrefix::UNKNOW,
        entity_id: EntityId::UNKNOW,
    };

    pub fn new(guid_prefix: GuidPrefix, entity_id: EntityId) -> Self {
        Self {
            guid_prefix,
            entity_id,
        }
    }

    pub fn new_participant_guid(small_rng: &mut SmallRng) -> Self {
        Self {
            guid_prefix: GuidPrefix::new(small_rng),
            entity_id: EntityId::PARTICIPANT,
        }
    }

    /// GUID of the participant which contains this entity
    pub fn participant_guid(&self) -> Self {
        Self {
            guid_prefix: self.guid_prefix,
            entity_id: EntityId::PARTICIPANT,
        }
    }
}

impl fmt::Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guid_prefix, self.entity_id)
    }
}

#[derive(Readable, Writable, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord, Hash)]
pub struct GuidPrefix {
    pub guid_prefix: [u8; 12],
}
impl GuidPrefix {
    pub const UNKNOW: Self = Self {
        guid_prefix: [0x00; 12],
    };

    // rtps 2.3 sprc, 9.3.1.5
    // implementations of the RTPS protocol shall set the first two bytes
    // of the guidPrefix to match their assigned vendorId
    pub fn new(small_rng: &mut SmallRng) -> Self {
        let mut bytes: [u8; 12] = small_rng.gen();

        // spec 8.2.4.2 The GUIDs of RTPS Participants
        // The implementation is free to chose the prefix,
        // as long as every Participant in the Domain has a unique GUID.
        bytes[0] = VendorId::THIS_IMPLEMENTATION.vendor_id[0];
        bytes[1] = VendorId::THIS_IMPLEMENTATION.vendor_id[1];
        Self { guid_prefix: bytes }
    }
}

impl fmt::Debug for GuidPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for GuidPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.guid_prefix {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}
