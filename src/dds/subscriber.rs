use crate::dds::{
    core::ParticipantCore,
    datareader::DataReader,
    lifecycle::{ChildSpec, DeletionMode},
    listener::{DataReaderListener, SubscriberListener},
    participant::DomainParticipant,
    qos::{DataReaderQos, DataReaderQosPolicies, QosPolicySet, SubscriberQosPolicies},
    status::StatusMask,
    topic::Topic,
};
use crate::error::{DdsError, DdsResult};
use crate::structure::{DdsEntity, GUID};
use alloc::sync::Arc;

/// DDS Subscriber
///
/// factory of DataReader
#[derive(Clone)]
pub struct Subscriber {
    core: Arc<ParticipantCore>,
    guid: GUID,
}

impl DdsEntity for Subscriber {
    fn guid(&self) -> GUID {
        self.guid
    }
}

impl Subscriber {
    pub(crate) fn new(core: Arc<ParticipantCore>, guid: GUID) -> Self {
        Self { core, guid }
    }

    pub fn create_datareader(
        &self,
        qos: DataReaderQos,
        topic: &Topic,
        listener: Option<Arc<dyn DataReaderListener>>,
        mask: StatusMask,
    ) -> DdsResult<DataReader> {
        let spec = ChildSpec::DataReader {
            topic: topic.guid(),
            qos,
            listener,
        };
        let parent = self.guid;
        let discovery_db = &self.core.discovery_db;
        let guid = self.core.with_state(|state, out| {
            state.create_child(parent, spec, mask, discovery_db, out)
        })?;
        Ok(DataReader::new(self.core.clone(), guid))
    }

    pub fn delete_datareader(&self, reader: &DataReader) -> DdsResult<()> {
        let guid = reader.guid();
        {
            let state = self.core.lock()?;
            if state.tree.get(guid)?.parent != self.guid {
                return Err(DdsError::PreconditionNotMet(format!(
                    "{} was not created by {}",
                    guid, self.guid
                )));
            }
        }
        self.core
            .with_state(|state, out| state.delete(guid, DeletionMode::Single, out))
    }

    /// a DataReader of this Subscriber bound to the topic `topic_name`
    pub fn lookup_datareader(&self, topic_name: &str) -> Option<DataReader> {
        let state = self.core.lock().ok()?;
        let topic = state.tree.find_topic(topic_name)?;
        state
            .tree
            .children_of(self.guid)
            .into_iter()
            .find(|r| state.tree.reader(*r).map(|b| b.topic == topic).unwrap_or(false))
            .map(|guid| DataReader::new(self.core.clone(), guid))
    }

    pub fn delete_contained_entities(&self) -> DdsResult<()> {
        let guid = self.guid;
        self.core
            .with_state(|state, out| state.delete_contained(guid, out))
    }

    pub fn get_default_datareader_qos(&self) -> DdsResult<DataReaderQosPolicies> {
        Ok(self
            .core
            .lock()?
            .tree
            .subscriber(self.guid)?
            .default_datareader_qos
            .clone())
    }

    pub fn set_default_datareader_qos(&self, qos: DataReaderQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        self.core
            .lock()?
            .tree
            .subscriber_mut(self.guid)?
            .default_datareader_qos = qos;
        Ok(())
    }

    pub fn get_qos(&self) -> DdsResult<SubscriberQosPolicies> {
        Ok(self.core.lock()?.tree.subscriber(self.guid)?.qos.clone())
    }

    pub fn set_qos(&self, qos: SubscriberQosPolicies) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.set_subscriber_qos(guid, qos, discovery_db, out))
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn SubscriberListener>>,
        mask: StatusMask,
    ) -> DdsResult<()> {
        let mut state = self.core.lock()?;
        state.tree.get_mut(self.guid)?.mask = mask;
        state.tree.subscriber_mut(self.guid)?.listener = listener;
        Ok(())
    }

    pub fn enable(&self) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.enable(guid, discovery_db, out))
    }

    pub fn get_participant(&self) -> DomainParticipant {
        DomainParticipant::from_core(self.core.clone())
    }
}
