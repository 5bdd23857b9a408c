//! listener interfaces of DDS entities
//!
//! Listeners are called from the participant's dispatcher thread, never while
//! the participant's internal lock is held, so they may call back into the API.
//! A status not handled by an entity's own listener (missing, or masked out)
//! propagates to the containing Publisher/Subscriber and then to the
//! DomainParticipant.

use crate::dds::{
    datareader::DataReader,
    datawriter::DataWriter,
    participant::DomainParticipant,
    status::{
        InconsistentTopicStatus, OfferedIncompatibleQosStatus, PublicationMatchedStatus,
        RequestedIncompatibleQosStatus, SubscriptionMatchedStatus,
    },
    topic::Topic,
};
use crate::discovery::structure::data::SPDPdiscoveredParticipantData;
use crate::structure::GuidPrefix;

pub trait DataWriterListener: Send + Sync {
    fn on_publication_matched(&self, _writer: &DataWriter, _status: PublicationMatchedStatus) {}
    fn on_offered_incompatible_qos(
        &self,
        _writer: &DataWriter,
        _status: OfferedIncompatibleQosStatus,
    ) {
    }
}

pub trait DataReaderListener: Send + Sync {
    fn on_subscription_matched(&self, _reader: &DataReader, _status: SubscriptionMatchedStatus) {}
    fn on_requested_incompatible_qos(
        &self,
        _reader: &DataReader,
        _status: RequestedIncompatibleQosStatus,
    ) {
    }
    fn on_data_available(&self, _reader: &DataReader) {}
}

pub trait TopicListener: Send + Sync {
    fn on_inconsistent_topic(&self, _topic: &Topic, _status: InconsistentTopicStatus) {}
}

pub trait PublisherListener: DataWriterListener {}

pub trait SubscriberListener: DataReaderListener {}

pub trait DomainParticipantListener: PublisherListener + SubscriberListener + TopicListener {
    fn on_participant_discovered(
        &self,
        _participant: &DomainParticipant,
        _data: &SPDPdiscoveredParticipantData,
    ) {
    }
    fn on_participant_lost(&self, _participant: &DomainParticipant, _guid_prefix: GuidPrefix) {}
}
