//! DomainCore: the DomainParticipant engine of a DDS implementation
//!
//! Participants are created by a [`dds::DomainParticipantFactory`] over a
//! [`network::Transport`]. They discover each other (SPDP/SEDP), match their
//! DataWriters and DataReaders by topic and QoS, and report the result to
//! listeners.

extern crate alloc;

pub mod dds;
mod discovery;
mod error;
mod matching;
mod message;
pub mod network;
mod rtps;
pub mod structure;

pub use discovery::structure::data::{
    DiscoveredReaderData, DiscoveredWriterData, SPDPdiscoveredParticipantData,
};
pub use error::{DdsError, DdsResult, ReturnCode};
pub use matching::{EndpointData, MatchRecord};
pub use message::submessage::SequenceNumber;
pub use rtps::cache::CacheChange;
