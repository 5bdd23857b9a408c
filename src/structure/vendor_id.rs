use serde::{Deserialize, Serialize};
use speedy::{Readable, Writable};

#[derive(Readable, Writable, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorId {
    pub vendor_id: [u8; 2],
}

impl VendorId {
    // no id assigned by the OMG DDS SIG
    // https://www.dds-foundation.org/dds-rtps-vendor-and-product-ids/
    pub const THIS_IMPLEMENTATION: Self = Self::VENDORID_UNKNOW;

    pub const VENDORID_UNKNOW: Self = Self {
        vendor_id: [0x00; 2],
    };
}
