use crate::dds::{
    core::ParticipantCore,
    datawriter::DataWriter,
    lifecycle::{ChildSpec, DeletionMode},
    listener::{DataWriterListener, PublisherListener},
    participant::DomainParticipant,
    qos::{DataWriterQos, DataWriterQosPolicies, PublisherQosPolicies, QosPolicySet},
    status::StatusMask,
    topic::Topic,
};
use crate::error::{DdsError, DdsResult};
use crate::structure::{DdsEntity, GUID};
use alloc::sync::Arc;

/// DDS Publisher
///
/// factory of DataWriter
#[derive(Clone)]
pub struct Publisher {
    core: Arc<ParticipantCore>,
    guid: GUID,
}

impl DdsEntity for Publisher {
    fn guid(&self) -> GUID {
        self.guid
    }
}

impl Publisher {
    pub(crate) fn new(core: Arc<ParticipantCore>, guid: GUID) -> Self {
        Self { core, guid }
    }

    pub fn create_datawriter(
        &self,
        qos: DataWriterQos,
        topic: &Topic,
        listener: Option<Arc<dyn DataWriterListener>>,
        mask: StatusMask,
    ) -> DdsResult<DataWriter> {
        let spec = ChildSpec::DataWriter {
            topic: topic.guid(),
            qos,
            listener,
        };
        let parent = self.guid;
        let discovery_db = &self.core.discovery_db;
        let guid = self.core.with_state(|state, out| {
            state.create_child(parent, spec, mask, discovery_db, out)
        })?;
        Ok(DataWriter::new(self.core.clone(), guid))
    }

    pub fn delete_datawriter(&self, writer: &DataWriter) -> DdsResult<()> {
        let guid = writer.guid();
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

    /// a DataWriter of this Publisher bound to the topic `topic_name`
    pub fn lookup_datawriter(&self, topic_name: &str) -> Option<DataWriter> {
        let state = self.core.lock().ok()?;
        let topic = state.tree.find_topic(topic_name)?;
        state
            .tree
            .children_of(self.guid)
            .into_iter()
            .find(|w| state.tree.writer(*w).map(|b| b.topic == topic).unwrap_or(false))
            .map(|guid| DataWriter::new(self.core.clone(), guid))
    }

    pub fn delete_contained_entities(&self) -> DdsResult<()> {
        let guid = self.guid;
        self.core
            .with_state(|state, out| state.delete_contained(guid, out))
    }

    pub fn get_default_datawriter_qos(&self) -> DdsResult<DataWriterQosPolicies> {
        Ok(self
            .core
            .lock()?
            .tree
            .publisher(self.guid)?
            .default_datawriter_qos
            .clone())
    }

    pub fn set_default_datawriter_qos(&self, qos: DataWriterQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        self.core
            .lock()?
            .tree
            .publisher_mut(self.guid)?
            .default_datawriter_qos = qos;
        Ok(())
    }

    pub fn get_qos(&self) -> DdsResult<PublisherQosPolicies> {
        Ok(self.core.lock()?.tree.publisher(self.guid)?.qos.clone())
    }

    pub fn set_qos(&self, qos: PublisherQosPolicies) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.set_publisher_qos(guid, qos, discovery_db, out))
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn PublisherListener>>,
        mask: StatusMask,
    ) -> DdsResult<()> {
        let mut state = self.core.lock()?;
        state.tree.get_mut(self.guid)?.mask = mask;
        state.tree.publisher_mut(self.guid)?.listener = listener;
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
