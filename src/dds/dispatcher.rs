//! listener dispatcher of a DomainParticipant
//!
//! Status changes are queued by whoever holds the participant lock and
//! delivered here in FIFO order on a dedicated thread. The listener is
//! resolved when the event is delivered: the entity's own listener if its mask
//! enables the status, else the Publisher/Subscriber's, else the participant's.

use crate::dds::{
    core::ParticipantCore,
    datareader::DataReader,
    datawriter::DataWriter,
    lifecycle::{EntityBody, EntityTree},
    listener::{
        DataReaderListener, DataWriterListener, DomainParticipantListener, PublisherListener,
        SubscriberListener, TopicListener,
    },
    participant::DomainParticipant,
    status::{
        InconsistentTopicStatus, OfferedIncompatibleQosStatus, PublicationMatchedStatus,
        RequestedIncompatibleQosStatus, StatusKind, SubscriptionMatchedStatus,
    },
    tokens::DISPATCH_TOKEN,
    topic::Topic,
};
use crate::discovery::structure::data::SPDPdiscoveredParticipantData;
use crate::error::IoResult;
use crate::structure::{GuidPrefix, GUID};
use alloc::sync::{Arc, Weak};
use log::{error, info, trace};
use mio_extras::channel as mio_channel;
use mio_v06::{Events, Poll, PollOpt, Ready};
use std::sync::mpsc::TryRecvError;

#[derive(Clone, Debug)]
pub(crate) enum StatusEvent {
    PublicationMatched(PublicationMatchedStatus),
    SubscriptionMatched(SubscriptionMatchedStatus),
    OfferedIncompatibleQos(OfferedIncompatibleQosStatus),
    RequestedIncompatibleQos(RequestedIncompatibleQosStatus),
    InconsistentTopic(InconsistentTopicStatus),
    DataAvailable,
    ParticipantDiscovered(SPDPdiscoveredParticipantData),
    ParticipantLost(GuidPrefix),
}

impl StatusEvent {
    fn kind(&self) -> StatusKind {
        match self {
            Self::PublicationMatched(_) => StatusKind::PublicationMatched,
            Self::SubscriptionMatched(_) => StatusKind::SubscriptionMatched,
            Self::OfferedIncompatibleQos(_) => StatusKind::OfferedIncompatibleQos,
            Self::RequestedIncompatibleQos(_) => StatusKind::RequestedIncompatibleQos,
            Self::InconsistentTopic(_) => StatusKind::InconsistentTopic,
            Self::DataAvailable => StatusKind::DataAvailable,
            Self::ParticipantDiscovered(_) | Self::ParticipantLost(_) => {
                StatusKind::ParticipantDiscovery
            }
        }
    }
}

/// a status change of the entity `target`
pub(crate) struct DispatchItem {
    pub target: GUID,
    pub event: StatusEvent,
}

pub(crate) enum DispatchMsg {
    Event(DispatchItem),
    Stop,
}

enum Callee {
    Writer(Arc<dyn DataWriterListener>),
    Publisher(Arc<dyn PublisherListener>),
    Reader(Arc<dyn DataReaderListener>),
    Subscriber(Arc<dyn SubscriberListener>),
    Topic(Arc<dyn TopicListener>),
    Participant(Arc<dyn DomainParticipantListener>),
}

macro_rules! call_writer_side {
    ($callee:expr, $method:ident, $($arg:expr),*) => {
        match $callee {
            Callee::Writer(l) => l.$method($($arg),*),
            Callee::Publisher(l) => l.$method($($arg),*),
            Callee::Participant(l) => l.$method($($arg),*),
            _ => (),
        }
    };
}

macro_rules! call_reader_side {
    ($callee:expr, $method:ident, $($arg:expr),*) => {
        match $callee {
            Callee::Reader(l) => l.$method($($arg),*),
            Callee::Subscriber(l) => l.$method($($arg),*),
            Callee::Participant(l) => l.$method($($arg),*),
            _ => (),
        }
    };
}

/// find the listener in charge of `kind` for `target`
fn resolve(tree: &EntityTree, target: GUID, kind: StatusKind) -> Option<Callee> {
    if tree.is_deleted() {
        return None;
    }
    let mut guid = target;
    while guid != tree.guid() {
        let node = tree.get(guid).ok()?;
        if node.mask.contains(kind) {
            let callee = match &node.body {
                EntityBody::DataWriter(w) => w.listener.clone().map(Callee::Writer),
                EntityBody::Publisher(p) => p.listener.clone().map(Callee::Publisher),
                EntityBody::DataReader(r) => r.listener.clone().map(Callee::Reader),
                EntityBody::Subscriber(s) => s.listener.clone().map(Callee::Subscriber),
                EntityBody::Topic(t) => t.listener.clone().map(Callee::Topic),
            };
            if callee.is_some() {
                return callee;
            }
        }
        guid = node.parent;
    }
    if tree.mask.contains(kind) {
        tree.listener.clone().map(Callee::Participant)
    } else {
        None
    }
}

pub(crate) struct Dispatcher {
    poll: Poll,
    receiver: mio_channel::Receiver<DispatchMsg>,
    core: Weak<ParticipantCore>,
}

impl Dispatcher {
    pub fn new(
        core: Weak<ParticipantCore>,
        receiver: mio_channel::Receiver<DispatchMsg>,
    ) -> IoResult<Self> {
        let poll = Poll::new()?;
        poll.register(&receiver, DISPATCH_TOKEN, Ready::readable(), PollOpt::edge())?;
        Ok(Self {
            poll,
            receiver,
            core,
        })
    }

    pub fn dispatch_loop(self) {
        let mut events = Events::with_capacity(128);
        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                error!("dispatcher poll failed: {}", e);
                return;
            }
            for event in events.iter() {
                if event.token() != DISPATCH_TOKEN {
                    continue;
                }
                loop {
                    match self.receiver.try_recv() {
                        Ok(DispatchMsg::Event(item)) => self.deliver(item),
                        Ok(DispatchMsg::Stop) | Err(TryRecvError::Disconnected) => {
                            info!("dispatcher stopped");
                            return;
                        }
                        Err(TryRecvError::Empty) => break,
                    }
                }
            }
        }
    }

    fn deliver(&self, item: DispatchItem) {
        let core = match self.core.upgrade() {
            Some(c) => c,
            None => return,
        };
        let callee = match core.lock() {
            Ok(state) => resolve(&state.tree, item.target, item.event.kind()),
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
        let callee = match callee {
            Some(c) => c,
            None => {
                trace!(
                    "no listener for {:?}\n\tEntity: {}",
                    item.event.kind(),
                    item.target
                );
                return;
            }
        };
        let target = item.target;
        match item.event {
            StatusEvent::PublicationMatched(status) => {
                let writer = DataWriter::new(core, target);
                call_writer_side!(&callee, on_publication_matched, &writer, status);
            }
            StatusEvent::OfferedIncompatibleQos(status) => {
                let writer = DataWriter::new(core, target);
                call_writer_side!(&callee, on_offered_incompatible_qos, &writer, status);
            }
            StatusEvent::SubscriptionMatched(status) => {
                let reader = DataReader::new(core, target);
                call_reader_side!(&callee, on_subscription_matched, &reader, status);
            }
            StatusEvent::RequestedIncompatibleQos(status) => {
                let reader = DataReader::new(core, target);
                call_reader_side!(&callee, on_requested_incompatible_qos, &reader, status);
            }
            StatusEvent::DataAvailable => {
                let reader = DataReader::new(core, target);
                call_reader_side!(&callee, on_data_available, &reader);
            }
            StatusEvent::InconsistentTopic(status) => {
                let topic = Topic::new(core, target);
                match &callee {
                    Callee::Topic(l) => l.on_inconsistent_topic(&topic, status),
                    Callee::Participant(l) => l.on_inconsistent_topic(&topic, status),
                    _ => (),
                }
            }
            StatusEvent::ParticipantDiscovered(data) => {
                if let Callee::Participant(l) = &callee {
                    l.on_participant_discovered(&DomainParticipant::from_core(core), &data);
                }
            }
            StatusEvent::ParticipantLost(guid_prefix) => {
                if let Callee::Participant(l) = &callee {
                    l.on_participant_lost(&DomainParticipant::from_core(core), guid_prefix);
                }
            }
        }
    }
}
