//!  Data Distribution Service (DDS) APIs

pub(crate) mod core;
mod datareader;
mod datawriter;
pub(crate) mod dispatcher;
mod event_loop;
mod factory;
pub(crate) mod lifecycle;
pub mod listener;
mod participant;
mod publisher;
pub mod qos;
pub mod status;
mod subscriber;
pub(crate) mod tokens;
mod topic;

pub use lifecycle::DeletionMode;

pub use {
    datareader::{DataReader, Sample},
    datawriter::DataWriter,
    factory::{DomainParticipantFactory, MAX_DOMAIN_ID, MAX_PARTICIPANTS_PER_DOMAIN},
    participant::DomainParticipant,
    publisher::Publisher,
    subscriber::Subscriber,
    topic::Topic,
};
