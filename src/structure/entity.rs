use crate::structure::{EntityId, GuidPrefix, GUID};

/// every DDS entity handle is identified by its GUID
pub trait DdsEntity {
    fn guid(&self) -> GUID;

    fn entity_id(&self) -> EntityId {
        self.guid().entity_id
    }

    fn guid_prefix(&self) -> GuidPrefix {
        self.guid().guid_prefix
    }
}
