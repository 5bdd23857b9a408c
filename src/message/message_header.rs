use crate::structure::{GuidPrefix, VendorId};
use serde::{Deserialize, Serialize};
use speedy::{Readable, Writable};

#[derive(Readable, Writable, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const PROTOCOLVERSION: Self = Self { major: 2, minor: 4 };
}

#[derive(Readable, Writable, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolId {
    protocol_id: [u8; 4],
}

impl ProtocolId {
    pub const PROTOCOLVID: Self = Self {
        protocol_id: [b'R', b'T', b'P', b'S'],
    };
}

/// fixed 20 octet header in front of every message
#[derive(Readable, Writable, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub protocol: ProtocolId,
    pub version: ProtocolVersion,
    pub vendor_id: VendorId,
    pub guid_prefix: GuidPrefix,
}

impl Header {
    pub const LENGTH: usize = 20;

    pub fn new(guid_prefix: GuidPrefix) -> Self {
        Self {
            protocol: ProtocolId::PROTOCOLVID,
            version: ProtocolVersion::PROTOCOLVERSION,
            vendor_id: VendorId::THIS_IMPLEMENTATION,
            guid_prefix,
        }
    }
}
