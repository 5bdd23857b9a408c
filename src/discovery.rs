//! participant and endpoint discovery
//!
//! SPDP: every participant announces `SPDPdiscoveredParticipantData` by
//! multicast each `announcement_period`, and by unicast to every participant it
//! newly discovers. SEDP: every enabled local endpoint is announced as
//! `DiscoveredWriterData` / `DiscoveredReaderData`.
//!
//! [`Discovery`] runs on the participant's event thread. It keeps the
//! [`DiscoveryDB`] and drives the state machine of each remote participant:
//!
//! ```text
//! Unknown --SPDP--> Discovered --any message--> Alive <--> Lost --one more lease--> removed
//! ```
//!
//! and reports what changed as [`DiscoveryEvent`]s; matching them against the
//! local endpoints is up to the participant.

pub mod discovery_db;
pub mod structure {
    pub mod builtin_endpoint;
    pub mod data;
}

use crate::discovery::discovery_db::{DiscoveryDB, Heard, RemoteParticipantState};
use crate::discovery::structure::data::SPDPdiscoveredParticipantData;
use crate::matching::EndpointData;
use crate::message::submessage::Submessage;
use crate::structure::{DomainId, GuidPrefix, GUID};
use log::{debug, info, trace, warn};
use std::time::Instant;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum DiscoveryEvent {
    ParticipantDiscovered(SPDPdiscoveredParticipantData),
    /// a lost participant sent a message again
    ParticipantRevived(GuidPrefix),
    ParticipantLost(GuidPrefix),
    /// removed from the DiscoveryDB, by dispose or after being lost
    ParticipantRemoved {
        guid_prefix: GuidPrefix,
        was_lost: bool,
    },
    EndpointChanged(EndpointData),
    EndpointRemoved(GUID),
}

pub(crate) struct Discovery {
    domain_id: DomainId,
    guid_prefix: GuidPrefix,
    discovery_db: DiscoveryDB,
}

impl Discovery {
    pub fn new(domain_id: DomainId, guid_prefix: GuidPrefix, discovery_db: DiscoveryDB) -> Self {
        Self {
            domain_id,
            guid_prefix,
            discovery_db,
        }
    }

    /// account a message received from `source`
    ///
    /// every message of a known participant refreshes its lease; builtin
    /// submessages also update the DiscoveryDB.
    pub fn handle_message(
        &self,
        source: GuidPrefix,
        submessage: &Submessage,
        now: Instant,
    ) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        if source == self.guid_prefix {
            return events;
        }
        match submessage {
            Submessage::Participant(data) => {
                if data.domain_id != self.domain_id {
                    debug!(
                        "ignore SPDP of domain {} in domain {}\n\tParticipant: {}",
                        data.domain_id, self.domain_id, data.guid
                    );
                    return events;
                }
                if data.guid.guid_prefix != source {
                    warn!(
                        "SPDP data of {} sent by {}, ignored",
                        data.guid.guid_prefix, source
                    );
                    return events;
                }
                if self.discovery_db.write_participant(data.clone(), now) {
                    info!(
                        "discovered new Participant\n\tParticipant: {}\n\tlease_duration: {:?}",
                        data.guid, data.lease_duration
                    );
                    events.push(DiscoveryEvent::ParticipantDiscovered(data.clone()));
                    return events;
                }
            }
            Submessage::ParticipantDispose(guid_prefix) => {
                if *guid_prefix == source {
                    if let Some(p) = self.discovery_db.remove_participant(source) {
                        info!("Participant disposed\n\tParticipant: {}", p.data.guid);
                        events.push(DiscoveryEvent::ParticipantRemoved {
                            guid_prefix: source,
                            was_lost: p.state == RemoteParticipantState::Lost,
                        });
                    }
                }
                return events;
            }
            _ => (),
        }

        match self.discovery_db.heard_from(source, now) {
            Heard::Unknown => {
                trace!(
                    "{} from unknown Participant {}, ignored",
                    submessage.kind_str(),
                    source
                );
                return events;
            }
            Heard::Revived => {
                info!("lost Participant is alive again\n\tParticipant: {}", source);
                events.push(DiscoveryEvent::ParticipantRevived(source));
            }
            Heard::Known => (),
        }

        let changed = match submessage {
            Submessage::Publication(w) => Some(EndpointData::Writer(w.clone())),
            Submessage::Subscription(r) => Some(EndpointData::Reader(r.clone())),
            _ => None,
        };
        if let Some(data) = changed {
            if data.guid().guid_prefix != source {
                warn!("SEDP data of {} sent by {}, ignored", data.guid(), source);
            } else if self.discovery_db.write_endpoint(data.clone()) {
                debug!(
                    "discovered endpoint\n\tEndpoint: {}\n\ttopic: {}",
                    data.guid(),
                    data.topic_name()
                );
                events.push(DiscoveryEvent::EndpointChanged(data));
            }
        }
        if let Submessage::EndpointDispose(guid) = submessage {
            if self.discovery_db.remove_endpoint(*guid) {
                debug!("remote endpoint disposed\n\tEndpoint: {}", guid);
                events.push(DiscoveryEvent::EndpointRemoved(*guid));
            }
        }
        events
    }

    pub fn check_leases(&self, now: Instant) -> Vec<DiscoveryEvent> {
        let check = self.discovery_db.check_leases(now);
        let mut events = Vec::new();
        for guid_prefix in check.lost {
            info!("Participant lease expired\n\tParticipant: {}", guid_prefix);
            events.push(DiscoveryEvent::ParticipantLost(guid_prefix));
        }
        for guid_prefix in check.removed {
            debug!("forget lost Participant\n\tParticipant: {}", guid_prefix);
            events.push(DiscoveryEvent::ParticipantRemoved {
                guid_prefix,
                was_lost: true,
            });
        }
        events
    }
}
