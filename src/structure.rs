//! structures for DDS & RTPS

mod duration;
mod entity;
mod entity_id;
mod guid;
mod proxy;
mod topic_kind;
mod vendor_id;

#[doc(inline)]
pub use {
    duration::Duration,
    entity::DdsEntity,
    entity_id::{EntityId, EntityKind},
    guid::{GuidPrefix, GUID},
    topic_kind::TopicKind,
    vendor_id::VendorId,
};

pub(crate) use proxy::{ReaderProxy, WriterProxy};

/// DDS domain identifier
pub type DomainId = u16;
