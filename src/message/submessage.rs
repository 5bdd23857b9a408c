use crate::discovery::structure::data::{
    DiscoveredReaderData, DiscoveredWriterData, SPDPdiscoveredParticipantData,
};
use crate::structure::{GuidPrefix, GUID};
use core::fmt;
use core::ops::{Add, Sub};
use serde::{Deserialize, Serialize};

/// sequence number of a change, starting at 1 for the first change of a writer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub i64);

impl SequenceNumber {
    pub const ZERO: Self = Self(0);
    pub const MIN: Self = Self(1);
}

impl Add<i64> for SequenceNumber {
    type Output = Self;
    fn add(self, rhs: i64) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub<i64> for SequenceNumber {
    type Output = Self;
    fn sub(self, rhs: i64) -> Self {
        Self(self.0 - rhs)
    }
}

impl fmt::Debug for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SN({})", self.0)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// user payload of a writer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub writer_guid: GUID,
    pub sequence_number: SequenceNumber,
    /// nanoseconds since UNIX epoch
    pub source_timestamp: i64,
    pub payload: Vec<u8>,
}

/// writer announces the range of changes available to `reader_guid`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub reader_guid: GUID,
    pub writer_guid: GUID,
    pub first_sn: SequenceNumber,
    pub last_sn: SequenceNumber,
}

/// reader acknowledges everything up to `base` and requests `missing`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AckNack {
    pub reader_guid: GUID,
    pub writer_guid: GUID,
    pub base: SequenceNumber,
    pub missing: Vec<SequenceNumber>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Submessage {
    /// SPDP
    Participant(SPDPdiscoveredParticipantData),
    /// participant is going away
    ParticipantDispose(GuidPrefix),
    /// SEDP, publications
    Publication(DiscoveredWriterData),
    /// SEDP, subscriptions
    Subscription(DiscoveredReaderData),
    /// a writer or reader was deleted
    EndpointDispose(GUID),
    Data(Data),
    Heartbeat(Heartbeat),
    AckNack(AckNack),
}

impl Submessage {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Participant(_) => "SPDP",
            Self::ParticipantDispose(_) => "SPDP dispose",
            Self::Publication(_) => "SEDP publication",
            Self::Subscription(_) => "SEDP subscription",
            Self::EndpointDispose(_) => "SEDP dispose",
            Self::Data(_) => "DATA",
            Self::Heartbeat(_) => "HEARTBEAT",
            Self::AckNack(_) => "ACKNACK",
        }
    }
}
