//! transport abstraction between participants
//!
//! The participant engine only needs to hand a serialized message to a peer
//! participant (or to every participant of the domain) and to receive the
//! messages addressed to it. Socket or shared-memory transports implement
//! [`Transport`]; [`LoopbackTransport`] connects participants of one process.

mod loopback;

pub use loopback::LoopbackTransport;

use crate::error::IoResult;
use crate::structure::{DomainId, GuidPrefix};
use bytes::Bytes;
use mio_extras::channel as mio_channel;

pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // This is max we can get from UDP.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    /// every other participant of the domain
    Multicast,
    Participant(GuidPrefix),
}

pub trait Transport: Send + Sync {
    /// start receiving messages for `local`; they are pushed into `inbox`
    fn open(
        &self,
        domain_id: DomainId,
        local: GuidPrefix,
        inbox: mio_channel::Sender<Bytes>,
    ) -> IoResult<()>;

    fn close(&self, domain_id: DomainId, local: GuidPrefix);

    /// best effort: a destination that is not reachable is not an error
    fn send(
        &self,
        domain_id: DomainId,
        source: GuidPrefix,
        destination: Destination,
        message: Bytes,
    ) -> IoResult<()>;

    fn max_message_size(&self) -> usize {
        MAX_MESSAGE_SIZE
    }
}
