use crate::dds::qos::{
    policy::UserData, DataReaderQosPolicies, DataWriterQosPolicies, PublisherQosPolicies,
    SubscriberQosPolicies,
};
use crate::discovery::structure::builtin_endpoint::BuiltinEndpoint;
use crate::message::message_header::ProtocolVersion;
use crate::structure::{DomainId, Duration, VendorId, GUID};
use enumflags2::BitFlags;
use serde::{Deserialize, Serialize};

/// rtps spec, 8.5.3.2 SPDPdiscoveredParticipantData
///
/// announced periodically by every participant, and handed to
/// `DomainParticipantListener::on_participant_discovered`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SPDPdiscoveredParticipantData {
    pub domain_id: DomainId,
    pub protocol_version: ProtocolVersion,
    pub guid: GUID,
    pub vendor_id: VendorId,
    pub available_builtin_endpoint: BitFlags<BuiltinEndpoint>,
    pub lease_duration: Duration,
    pub user_data: UserData,
}

impl SPDPdiscoveredParticipantData {
    pub(crate) fn new(
        domain_id: DomainId,
        guid: GUID,
        lease_duration: Duration,
        user_data: UserData,
    ) -> Self {
        Self {
            domain_id,
            protocol_version: ProtocolVersion::PROTOCOLVERSION,
            guid,
            vendor_id: VendorId::THIS_IMPLEMENTATION,
            available_builtin_endpoint: BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_PARTICIPANT_ANNOUNCER
                | BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_PARTICIPANT_DETECTOR
                | BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_PUBLICATIONS_ANNOUNCER
                | BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_PUBLICATIONS_DETECTOR
                | BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_SUBSCRIPTIONS_ANNOUNCER
                | BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_SUBSCRIPTIONS_DETECTOR,
            lease_duration,
            user_data,
        }
    }

    pub fn has_endpoint_discovery(&self) -> bool {
        self.available_builtin_endpoint.contains(
            BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_PUBLICATIONS_ANNOUNCER
                | BuiltinEndpoint::DISC_BUILTIN_ENDPOINT_SUBSCRIPTIONS_DETECTOR,
        )
    }
}

/// rtps spec, 8.5.4.2 DiscoveredWriterData
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredWriterData {
    pub guid: GUID,
    pub topic_name: String,
    pub type_name: String,
    pub qos: DataWriterQosPolicies,
    pub publisher_qos: PublisherQosPolicies,
}

/// rtps spec, 8.5.4.3 DiscoveredReaderData
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredReaderData {
    pub guid: GUID,
    pub topic_name: String,
    pub type_name: String,
    pub qos: DataReaderQosPolicies,
    pub subscriber_qos: SubscriberQosPolicies,
}
