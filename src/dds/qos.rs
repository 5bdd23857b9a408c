//! set of DDS QoS policies for each Entity, their builders, and the
//! consistency / mutability / compatibility rules between them

// DDS 1.4 spec: 2.2.3 Supported QoS, 2.3.3 DCPS PSM : IDL

use crate::error::{DdsError, DdsResult};
use policy::*;
use serde::{Deserialize, Serialize};

macro_rules! getter_method {
    ($name:ident, $policy_type:ident) => {
        pub fn $name(&self) -> $policy_type {
            self.$name.clone()
        }
    };
}

macro_rules! getter_method_with_bool {
    ($name:ident, $policy_type:ident) => {
        pub fn $name(&self) -> $policy_type {
            self.$name.0.clone()
        }
    };
}

macro_rules! setter_method {
    ($setter:ident, $name:ident, $policy_type:ident) => {
        pub fn $setter(&mut self, $name: $policy_type) {
            self.$name = $name;
        }
    };
}

macro_rules! setter_method_with_bool {
    ($setter:ident, $name:ident, $policy_type:ident) => {
        pub fn $setter(&mut self, $name: $policy_type) {
            self.$name = ($name, true);
        }
    };
}

/// policy of a tuple-style set differs from the current value
macro_rules! reject_changed {
    ($new:ident, $current:ident, $name:ident) => {
        if $new.$name.0 != $current.$name.0 {
            return Err(DdsError::ImmutablePolicy(format!(
                "{} can't be changed after the entity is enabled",
                stringify!($name)
            )));
        }
    };
}

macro_rules! check_compatible {
    ($policy_type:ident, $offered:expr, $requested:expr, $id:expr, $failed:ident) => {
        if !$policy_type::is_compatible($offered, $requested) {
            $failed.push($id);
        }
    };
}

/// common rules of every QoS policy set
pub trait QosPolicySet: Clone {
    /// check that the set is self-consistent and implementable.
    ///
    /// pure and idempotent, it never modifies the set.
    fn validate(&self) -> DdsResult<()>;

    /// check that `self` does not change any immutable policy of `current`
    fn check_immutable(&self, current: &Self) -> DdsResult<()>;
}

/// validate `qos` as a whole: `InconsistentPolicy` or `Unsupported` on failure
pub fn validate<Q: QosPolicySet>(qos: &Q) -> DdsResult<()> {
    qos.validate()
}

/// identifiers of QoS policies, used in incompatible QoS statuses
///
/// DDS v1.4 spec, 2.3.3 DCPS PSM : IDL, QosPolicyId_t
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum QosPolicyId {
    UserData = 1,
    Durability = 2,
    Presentation = 3,
    Deadline = 4,
    LatencyBudget = 5,
    Ownership = 6,
    OwnershipStrength = 7,
    Liveliness = 8,
    TimeBasedFilter = 9,
    Partition = 10,
    Reliability = 11,
    DestinationOrder = 12,
    History = 13,
    ResourceLimits = 14,
    EntityFactory = 15,
    WriterDataLifecycle = 16,
    ReaderDataLifecycle = 17,
    TopicData = 18,
    GroupData = 19,
    TransportPriority = 20,
    Lifespan = 21,
    DurabilityService = 22,
    DiscoveryConfig = 0x8001,
}

/// for setting QoS on a DomainParticipant
#[derive(Clone)]
pub enum DomainParticipantQos {
    /// represent default QoS of DomainParticipant.
    ///
    /// it can get `DomainParticipantFactory::get_default_participant_qos()` and
    /// change `DomainParticipantFactory::set_default_participant_qos()`
    Default,
    Policies(Box<DomainParticipantQosPolicies>),
}

/// A collection of QoS policies for configuring the behavior of a DomainParticipant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainParticipantQosPolicies {
    user_data: UserData,
    entity_factory: EntityFactory,
    discovery_config: DiscoveryConfig,
}

impl DomainParticipantQosPolicies {
    getter_method!(user_data, UserData);
    getter_method!(entity_factory, EntityFactory);
    getter_method!(discovery_config, DiscoveryConfig);
    setter_method!(set_user_data, user_data, UserData);
    setter_method!(set_entity_factory, entity_factory, EntityFactory);
    setter_method!(set_discovery_config, discovery_config, DiscoveryConfig);
}

impl Default for DomainParticipantQosPolicies {
    fn default() -> Self {
        DomainParticipantQosBuilder::new().build()
    }
}

impl QosPolicySet for DomainParticipantQosPolicies {
    fn validate(&self) -> DdsResult<()> {
        self.discovery_config.validate()
    }

    fn check_immutable(&self, current: &Self) -> DdsResult<()> {
        if self.discovery_config != current.discovery_config {
            return Err(DdsError::ImmutablePolicy(
                "discovery_config can't be changed after the entity is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// for setting QoS on a Topic
#[derive(Clone)]
pub enum TopicQos {
    /// represent default QoS of Topic.
    ///
    /// it can get `DomainParticipant::get_default_topic_qos()` and
    /// change `DomainParticipant::set_default_topic_qos()`
    Default,
    Policies(Box<TopicQosPolicies>),
}

/// A collection of QoS policies for configuring the behavior of a Topic
///
/// Each member of TopicQosPolicies has the type (policy_type, bool).
/// The bool flag indicates whether the policy was explicitly set by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicQosPolicies {
    topic_data: (TopicData, bool),
    durability: (Durability, bool),
    durability_service: (DurabilityService, bool),
    deadline: (Deadline, bool),
    latency_budget: (LatencyBudget, bool),
    liveliness: (Liveliness, bool),
    reliability: (Reliability, bool),
    destination_order: (DestinationOrder, bool),
    history: (History, bool),
    resource_limits: (ResourceLimits, bool),
    transport_priority: (TransportPriority, bool),
    lifespan: (Lifespan, bool),
    ownership: (Ownership, bool),
}
impl TopicQosPolicies {
    getter_method_with_bool!(topic_data, TopicData);
    getter_method_with_bool!(durability, Durability);
    getter_method_with_bool!(durability_service, DurabilityService);
    getter_method_with_bool!(deadline, Deadline);
    getter_method_with_bool!(latency_budget, LatencyBudget);
    getter_method_with_bool!(liveliness, Liveliness);
    getter_method_with_bool!(reliability, Reliability);
    getter_method_with_bool!(destination_order, DestinationOrder);
    getter_method_with_bool!(history, History);
    getter_method_with_bool!(resource_limits, ResourceLimits);
    getter_method_with_bool!(transport_priority, TransportPriority);
    getter_method_with_bool!(lifespan, Lifespan);
    getter_method_with_bool!(ownership, Ownership);
    setter_method_with_bool!(set_topic_data, topic_data, TopicData);
    setter_method_with_bool!(set_durability, durability, Durability);
    setter_method_with_bool!(set_deadline, deadline, Deadline);
    setter_method_with_bool!(set_reliability, reliability, Reliability);
    setter_method_with_bool!(set_history, history, History);
    setter_method_with_bool!(set_resource_limits, resource_limits, ResourceLimits);
    setter_method_with_bool!(set_lifespan, lifespan, Lifespan);

    pub fn to_datawriter_qos(&self) -> DataWriterQosPolicies {
        DataWriterQosPolicies {
            durability: self.durability,
            durability_service: self.durability_service,
            deadline: self.deadline,
            latency_budget: self.latency_budget,
            liveliness: self.liveliness,
            reliability: self.reliability,
            destination_order: self.destination_order,
            history: self.history,
            resource_limits: self.resource_limits,
            transport_priority: self.transport_priority,
            lifespan: self.lifespan,
            user_data: (UserData::default(), false),
            ownership: self.ownership,
            ownership_strength: (OwnershipStrength::default(), false),
            writer_data_lifecycle: (WriterDataLifecycle::default(), false),
        }
    }
    pub fn to_datareader_qos(&self) -> DataReaderQosPolicies {
        DataReaderQosPolicies {
            durability: self.durability,
            deadline: self.deadline,
            latency_budget: self.latency_budget,
            liveliness: self.liveliness,
            reliability: self.reliability,
            destination_order: self.destination_order,
            history: self.history,
            resource_limits: self.resource_limits,
            user_data: (UserData::default(), false),
            ownership: self.ownership,
            time_based_filter: (TimeBasedFilter::default(), false),
            reader_data_lifecycle: (ReaderDataLifecycle::default(), false),
        }
    }
}

impl Default for TopicQosPolicies {
    fn default() -> Self {
        TopicQosBuilder::new().build()
    }
}

impl QosPolicySet for TopicQosPolicies {
    fn validate(&self) -> DdsResult<()> {
        self.durability.0.check_supported()?;
        self.durability_service.0.validate()?;
        self.deadline.0.validate()?;
        self.liveliness.0.validate()?;
        History::validate_with_limits(&self.history.0, &self.resource_limits.0)
    }

    fn check_immutable(&self, current: &Self) -> DdsResult<()> {
        reject_changed!(self, current, durability);
        reject_changed!(self, current, durability_service);
        reject_changed!(self, current, liveliness);
        reject_changed!(self, current, reliability);
        reject_changed!(self, current, destination_order);
        reject_changed!(self, current, history);
        reject_changed!(self, current, resource_limits);
        reject_changed!(self, current, ownership);
        Ok(())
    }
}

/// for setting QoS on a DataWriter
#[derive(Clone)]
pub enum DataWriterQos {
    /// represent default QoS of DataWriter.
    ///
    /// it can get `Publisher::get_default_datawriter_qos()` and
    /// change `Publisher::set_default_datawriter_qos()`
    Default,
    Policies(Box<DataWriterQosPolicies>),
}

/// A collection of QoS policies for configuring the behavior of a DataWriter
///
/// Each member of DataWriterQosPolicies has the type (policy_type, bool).
/// The bool flag indicates whether the policy was explicitly set by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataWriterQosPolicies {
    durability: (Durability, bool),
    durability_service: (DurabilityService, bool),
    deadline: (Deadline, bool),
    latency_budget: (LatencyBudget, bool),
    liveliness: (Liveliness, bool),
    reliability: (Reliability, bool),
    destination_order: (DestinationOrder, bool),
    history: (History, bool),
    resource_limits: (ResourceLimits, bool),
    transport_priority: (TransportPriority, bool),
    lifespan: (Lifespan, bool),
    user_data: (UserData, bool),
    ownership: (Ownership, bool),
    ownership_strength: (OwnershipStrength, bool),
    writer_data_lifecycle: (WriterDataLifecycle, bool),
}

impl DataWriterQosPolicies {
    getter_method_with_bool!(durability, Durability);
    getter_method_with_bool!(durability_service, DurabilityService);
    getter_method_with_bool!(deadline, Deadline);
    getter_method_with_bool!(latency_budget, LatencyBudget);
    getter_method_with_bool!(liveliness, Liveliness);
    getter_method_with_bool!(reliability, Reliability);
    getter_method_with_bool!(destination_order, DestinationOrder);
    getter_method_with_bool!(history, History);
    getter_method_with_bool!(resource_limits, ResourceLimits);
    getter_method_with_bool!(transport_priority, TransportPriority);
    getter_method_with_bool!(lifespan, Lifespan);
    getter_method_with_bool!(user_data, UserData);
    getter_method_with_bool!(ownership, Ownership);
    getter_method_with_bool!(ownership_strength, OwnershipStrength);
    getter_method_with_bool!(writer_data_lifecycle, WriterDataLifecycle);
    setter_method_with_bool!(set_durability, durability, Durability);
    setter_method_with_bool!(set_deadline, deadline, Deadline);
    setter_method_with_bool!(set_latency_budget, latency_budget, LatencyBudget);
    setter_method_with_bool!(set_liveliness, liveliness, Liveliness);
    setter_method_with_bool!(set_reliability, reliability, Reliability);
    setter_method_with_bool!(set_history, history, History);
    setter_method_with_bool!(set_resource_limits, resource_limits, ResourceLimits);
    setter_method_with_bool!(set_lifespan, lifespan, Lifespan);
    setter_method_with_bool!(set_user_data, user_data, UserData);
    setter_method_with_bool!(set_ownership, ownership, Ownership);
    setter_method_with_bool!(set_ownership_strength, ownership_strength, OwnershipStrength);

    /// check this writer (offered) against a reader (requested)
    ///
    /// returns the ids of every incompatible policy
    pub fn is_compatible(&self, qos: &DataReaderQosPolicies) -> Result<(), Vec<QosPolicyId>> {
        let mut failed = Vec::new();
        check_compatible!(
            Durability,
            self.durability.0,
            qos.durability.0,
            QosPolicyId::Durability,
            failed
        );
        check_compatible!(
            Deadline,
            self.deadline.0,
            qos.deadline.0,
            QosPolicyId::Deadline,
            failed
        );
        check_compatible!(
            LatencyBudget,
            self.latency_budget.0,
            qos.latency_budget.0,
            QosPolicyId::LatencyBudget,
            failed
        );
        check_compatible!(
            Ownership,
            self.ownership.0,
            qos.ownership.0,
            QosPolicyId::Ownership,
            failed
        );
        check_compatible!(
            Liveliness,
            self.liveliness.0,
            qos.liveliness.0,
            QosPolicyId::Liveliness,
            failed
        );
        check_compatible!(
            Reliability,
            self.reliability.0,
            qos.reliability.0,
            QosPolicyId::Reliability,
            failed
        );
        check_compatible!(
            DestinationOrder,
            self.destination_order.0,
            qos.destination_order.0,
            QosPolicyId::DestinationOrder,
            failed
        );
        if failed.is_empty() {
            Ok(())
        } else {
            Err(failed)
        }
    }

    pub fn combine(&mut self, policies: Self) {
        macro_rules! combine_policy {
            ($policy_name:ident) => {
                if self.$policy_name.0 != policies.$policy_name.0 {
                    // differ: the explicitly specified one wins
                    if policies.$policy_name.1 {
                        self.$policy_name = policies.$policy_name;
                    }
                } else {
                    // identical: still user-specified if either side was
                    self.$policy_name.1 |= policies.$policy_name.1
                }
            };
        }
        combine_policy!(durability);
        combine_policy!(durability_service);
        combine_policy!(deadline);
        combine_policy!(latency_budget);
        combine_policy!(liveliness);
        combine_policy!(reliability);
        combine_policy!(destination_order);
        combine_policy!(history);
        combine_policy!(resource_limits);
        combine_policy!(transport_priority);
        combine_policy!(lifespan);
        combine_policy!(user_data);
        combine_policy!(ownership);
        combine_policy!(ownership_strength);
        combine_policy!(writer_data_lifecycle);
    }
}

impl Default for DataWriterQosPolicies {
    fn default() -> Self {
        DataWriterQosBuilder::new().build()
    }
}

impl QosPolicySet for DataWriterQosPolicies {
    fn validate(&self) -> DdsResult<()> {
        self.durability.0.check_supported()?;
        self.durability_service.0.validate()?;
        self.deadline.0.validate()?;
        self.liveliness.0.validate()?;
        History::validate_with_limits(&self.history.0, &self.resource_limits.0)
    }

    fn check_immutable(&self, current: &Self) -> DdsResult<()> {
        reject_changed!(self, current, durability);
        reject_changed!(self, current, durability_service);
        reject_changed!(self, current, liveliness);
        reject_changed!(self, current, reliability);
        reject_changed!(self, current, destination_order);
        reject_changed!(self, current, history);
        reject_changed!(self, current, resource_limits);
        reject_changed!(self, current, ownership);
        Ok(())
    }
}

/// for setting QoS on a Publisher
#[derive(Clone)]
pub enum PublisherQos {
    /// represent default QoS of Publisher.
    ///
    /// it can get `DomainParticipant::get_default_publisher_qos()` and
    /// change `DomainParticipant::set_default_publisher_qos()`
    Default,
    Policies(Box<PublisherQosPolicies>),
}

/// A collection of QoS policies for configuring the behavior of a Publisher
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublisherQosPolicies {
    presentation: Presentation,
    partition: Partition,
    group_data: GroupData,
    entity_factory: EntityFactory,
}

impl PublisherQosPolicies {
    getter_method!(presentation, Presentation);
    getter_method!(partition, Partition);
    getter_method!(group_data, GroupData);
    getter_method!(entity_factory, EntityFactory);
    setter_method!(set_presentation, presentation, Presentation);
    setter_method!(set_partition, partition, Partition);
    setter_method!(set_group_data, group_data, GroupData);
    setter_method!(set_entity_factory, entity_factory, EntityFactory);

    /// check this publisher (offered) against a subscriber (requested)
    pub fn is_compatible(&self, qos: &SubscriberQosPolicies) -> Result<(), Vec<QosPolicyId>> {
        let mut failed = Vec::new();
        check_compatible!(
            Presentation,
            self.presentation,
            qos.presentation,
            QosPolicyId::Presentation,
            failed
        );
        check_compatible!(
            Partition,
            &self.partition,
            &qos.partition,
            QosPolicyId::Partition,
            failed
        );
        if failed.is_empty() {
            Ok(())
        } else {
            Err(failed)
        }
    }
}

impl Default for PublisherQosPolicies {
    fn default() -> Self {
        PublisherQosBuilder::new().build()
    }
}

impl QosPolicySet for PublisherQosPolicies {
    fn validate(&self) -> DdsResult<()> {
        self.presentation.check_supported()
    }

    fn check_immutable(&self, current: &Self) -> DdsResult<()> {
        if self.presentation != current.presentation {
            return Err(DdsError::ImmutablePolicy(
                "presentation can't be changed after the entity is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// for setting QoS on a DataReader
#[derive(Clone)]
pub enum DataReaderQos {
    /// represent default QoS of DataReader.
    ///
    /// it can get `Subscriber::get_default_datareader_qos()` and
    /// change `Subscriber::set_default_datareader_qos()`
    Default,
    Policies(Box<DataReaderQosPolicies>),
}

/// A collection of QoS policies for configuring the behavior of a DataReader
///
/// Each member of DataReaderQosPolicies has the type (policy_type, bool).
/// The bool flag indicates whether the policy was explicitly set by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataReaderQosPolicies {
    durability: (Durability, bool),
    deadline: (Deadline, bool),
    latency_budget: (LatencyBudget, bool),
    liveliness: (Liveliness, bool),
    reliability: (Reliability, bool),
    destination_order: (DestinationOrder, bool),
    history: (History, bool),
    resource_limits: (ResourceLimits, bool),
    user_data: (UserData, bool),
    ownership: (Ownership, bool),
    time_based_filter: (TimeBasedFilter, bool),
    reader_data_lifecycle: (ReaderDataLifecycle, bool),
}
impl DataReaderQosPolicies {
    getter_method_with_bool!(durability, Durability);
    getter_method_with_bool!(deadline, Deadline);
    getter_method_with_bool!(latency_budget, LatencyBudget);
    getter_method_with_bool!(liveliness, Liveliness);
    getter_method_with_bool!(reliability, Reliability);
    getter_method_with_bool!(destination_order, DestinationOrder);
    getter_method_with_bool!(history, History);
    getter_method_with_bool!(resource_limits, ResourceLimits);
    getter_method_with_bool!(user_data, UserData);
    getter_method_with_bool!(ownership, Ownership);
    getter_method_with_bool!(time_based_filter, TimeBasedFilter);
    getter_method_with_bool!(reader_data_lifecycle, ReaderDataLifecycle);
    setter_method_with_bool!(set_durability, durability, Durability);
    setter_method_with_bool!(set_deadline, deadline, Deadline);
    setter_method_with_bool!(set_latency_budget, latency_budget, LatencyBudget);
    setter_method_with_bool!(set_liveliness, liveliness, Liveliness);
    setter_method_with_bool!(set_reliability, reliability, Reliability);
    setter_method_with_bool!(set_history, history, History);
    setter_method_with_bool!(set_resource_limits, resource_limits, ResourceLimits);
    setter_method_with_bool!(set_user_data, user_data, UserData);
    setter_method_with_bool!(set_ownership, ownership, Ownership);
    setter_method_with_bool!(set_time_based_filter, time_based_filter, TimeBasedFilter);

    /// check this reader (requested) against a writer (offered)
    pub fn is_compatible(&self, qos: &DataWriterQosPolicies) -> Result<(), Vec<QosPolicyId>> {
        qos.is_compatible(self)
    }

    pub fn combine(&mut self, policies: Self) {
        macro_rules! combine_policy {
            ($policy_name:ident) => {
                if self.$policy_name.0 != policies.$policy_name.0 {
                    if policies.$policy_name.1 {
                        self.$policy_name = policies.$policy_name;
                    }
                } else {
                    self.$policy_name.1 |= policies.$policy_name.1
                }
            };
        }
        combine_policy!(durability);
        combine_policy!(deadline);
        combine_policy!(latency_budget);
        combine_policy!(liveliness);
        combine_policy!(reliability);
        combine_policy!(destination_order);
        combine_policy!(history);
        combine_policy!(resource_limits);
        combine_policy!(user_data);
        combine_policy!(ownership);
        combine_policy!(time_based_filter);
        combine_policy!(reader_data_lifecycle);
    }
}

impl Default for DataReaderQosPolicies {
    fn default() -> Self {
        DataReaderQosBuilder::new().build()
    }
}

impl QosPolicySet for DataReaderQosPolicies {
    fn validate(&self) -> DdsResult<()> {
        self.durability.0.check_supported()?;
        self.deadline.0.validate()?;
        self.liveliness.0.validate()?;
        History::validate_with_limits(&self.history.0, &self.resource_limits.0)?;
        if self.deadline.0.period < self.time_based_filter.0.minimum_separation {
            return Err(DdsError::InconsistentPolicy(format!(
                "deadline period {:?} is shorter than time_based_filter minimum_separation {:?}",
                self.deadline.0.period, self.time_based_filter.0.minimum_separation
            )));
        }
        Ok(())
    }

    fn check_immutable(&self, current: &Self) -> DdsResult<()> {
        reject_changed!(self, current, durability);
        reject_changed!(self, current, liveliness);
        reject_changed!(self, current, reliability);
        reject_changed!(self, current, destination_order);
        reject_changed!(self, current, history);
        reject_changed!(self, current, resource_limits);
        reject_changed!(self, current, ownership);
        Ok(())
    }
}

/// for setting QoS on a Subscriber
#[derive(Clone)]
pub enum SubscriberQos {
    /// represent default QoS of Subscriber.
    ///
    /// it can get `DomainParticipant::get_default_subscriber_qos()` and
    /// change `DomainParticipant::set_default_subscriber_qos()`
    Default,
    Policies(Box<SubscriberQosPolicies>),
}

/// A collection of QoS policies for configuring the behavior of a Subscriber
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriberQosPolicies {
    presentation: Presentation,
    partition: Partition,
    group_data: GroupData,
    entity_factory: EntityFactory,
}

impl SubscriberQosPolicies {
    getter_method!(presentation, Presentation);
    getter_method!(partition, Partition);
    getter_method!(group_data, GroupData);
    getter_method!(entity_factory, EntityFactory);
    setter_method!(set_presentation, presentation, Presentation);
    setter_method!(set_partition, partition, Partition);
    setter_method!(set_group_data, group_data, GroupData);
    setter_method!(set_entity_factory, entity_factory, EntityFactory);

    pub fn is_compatible(&self, qos: &PublisherQosPolicies) -> Result<(), Vec<QosPolicyId>> {
        qos.is_compatible(self)
    }
}

impl Default for SubscriberQosPolicies {
    fn default() -> Self {
        SubscriberQosBuilder::new().build()
    }
}

impl QosPolicySet for SubscriberQosPolicies {
    fn validate(&self) -> DdsResult<()> {
        self.presentation.check_supported()
    }

    fn check_immutable(&self, current: &Self) -> DdsResult<()> {
        if self.presentation != current.presentation {
            return Err(DdsError::ImmutablePolicy(
                "presentation can't be changed after the entity is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

macro_rules! builder_method {
    ($name:ident, $policy_name:ident) => {
        pub fn $name(mut self, $name: $policy_name) -> Self {
            self.$name = Some($name);
            self
        }
    };
}

/// Builder of DomainParticipantQosPolicies
#[derive(Default)]
pub struct DomainParticipantQosBuilder {
    user_data: Option<UserData>,
    entity_factory: Option<EntityFactory>,
    discovery_config: Option<DiscoveryConfig>,
}

impl DomainParticipantQosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    builder_method!(user_data, UserData);
    builder_method!(entity_factory, EntityFactory);
    builder_method!(discovery_config, DiscoveryConfig);

    pub fn build(self) -> DomainParticipantQosPolicies {
        DomainParticipantQosPolicies {
            user_data: self.user_data.unwrap_or_default(),
            entity_factory: self.entity_factory.unwrap_or_default(),
            discovery_config: self.discovery_config.unwrap_or_default(),
        }
    }
}

/// Builder of TopicQosPolicies
#[derive(Default)]
pub struct TopicQosBuilder {
    topic_data: Option<TopicData>,
    durability: Option<Durability>,
    durability_service: Option<DurabilityService>,
    deadline: Option<Deadline>,
    latency_budget: Option<LatencyBudget>,
    liveliness: Option<Liveliness>,
    reliability: Option<Reliability>,
    destination_order: Option<DestinationOrder>,
    history: Option<History>,
    resource_limits: Option<ResourceLimits>,
    transport_priority: Option<TransportPriority>,
    lifespan: Option<Lifespan>,
    ownership: Option<Ownership>,
}

impl TopicQosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    builder_method!(topic_data, TopicData);
    builder_method!(durability, Durability);
    builder_method!(durability_service, DurabilityService);
    builder_method!(deadline, Deadline);
    builder_method!(latency_budget, LatencyBudget);
    builder_method!(liveliness, Liveliness);
    builder_method!(reliability, Reliability);
    builder_method!(destination_order, DestinationOrder);
    builder_method!(history, History);
    builder_method!(resource_limits, ResourceLimits);
    builder_method!(transport_priority, TransportPriority);
    builder_method!(lifespan, Lifespan);
    builder_method!(ownership, Ownership);

    pub fn build(self) -> TopicQosPolicies {
        macro_rules! decide_value {
            ($name:ident, $type:ident) => {
                match self.$name {
                    Some(qos_policy) => (qos_policy, true),
                    None => ($type::default(), false),
                }
            };
        }
        TopicQosPolicies {
            topic_data: decide_value!(topic_data, TopicData),
            durability: decide_value!(durability, Durability),
            durability_service: decide_value!(durability_service, DurabilityService),
            deadline: decide_value!(deadline, Deadline),
            latency_budget: decide_value!(latency_budget, LatencyBudget),
            liveliness: decide_value!(liveliness, Liveliness),
            reliability: match self.reliability {
                Some(reliability) => (reliability, true),
                None => (Reliability::default_besteffort(), false),
            },
            destination_order: decide_value!(destination_order, DestinationOrder),
            history: decide_value!(history, History),
            resource_limits: decide_value!(resource_limits, ResourceLimits),
            transport_priority: decide_value!(transport_priority, TransportPriority),
            lifespan: decide_value!(lifespan, Lifespan),
            ownership: decide_value!(ownership, Ownership),
        }
    }
}

/// Builder of DataWriterQosPolicies
#[derive(Default)]
pub struct DataWriterQosBuilder {
    durability: Option<Durability>,
    durability_service: Option<DurabilityService>,
    deadline: Option<Deadline>,
    latency_budget: Option<LatencyBudget>,
    liveliness: Option<Liveliness>,
    reliability: Option<Reliability>,
    destination_order: Option<DestinationOrder>,
    history: Option<History>,
    resource_limits: Option<ResourceLimits>,
    transport_priority: Option<TransportPriority>,
    lifespan: Option<Lifespan>,
    user_data: Option<UserData>,
    ownership: Option<Ownership>,
    ownership_strength: Option<OwnershipStrength>,
    writer_data_lifecycle: Option<WriterDataLifecycle>,
}

impl DataWriterQosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    builder_method!(durability, Durability);
    builder_method!(durability_service, DurabilityService);
    builder_method!(deadline, Deadline);
    builder_method!(latency_budget, LatencyBudget);
    builder_method!(liveliness, Liveliness);
    builder_method!(reliability, Reliability);
    builder_method!(destination_order, DestinationOrder);
    builder_method!(history, History);
    builder_method!(resource_limits, ResourceLimits);
    builder_method!(transport_priority, TransportPriority);
    builder_method!(lifespan, Lifespan);
    builder_method!(user_data, UserData);
    builder_method!(ownership, Ownership);
    builder_method!(ownership_strength, OwnershipStrength);
    builder_method!(writer_data_lifecycle, WriterDataLifecycle);

    pub fn build(self) -> DataWriterQosPolicies {
        macro_rules! decide_value {
            ($name:ident, $type:ident) => {
                match self.$name {
                    Some(qos_policy) => (qos_policy, true),
                    None => ($type::default(), false),
                }
            };
        }
        DataWriterQosPolicies {
            durability: decide_value!(durability, Durability),
            durability_service: decide_value!(durability_service, DurabilityService),
            deadline: decide_value!(deadline, Deadline),
            latency_budget: decide_value!(latency_budget, LatencyBudget),
            liveliness: decide_value!(liveliness, Liveliness),
            reliability: match self.reliability {
                Some(reliability) => (reliability, true),
                None => (Reliability::default_reliable(), false),
            },
            destination_order: decide_value!(destination_order, DestinationOrder),
            history: decide_value!(history, History),
            resource_limits: decide_value!(resource_limits, ResourceLimits),
            transport_priority: decide_value!(transport_priority, TransportPriority),
            lifespan: decide_value!(lifespan, Lifespan),
            user_data: decide_value!(user_data, UserData),
            ownership: decide_value!(ownership, Ownership),
            ownership_strength: decide_value!(ownership_strength, OwnershipStrength),
            writer_data_lifecycle: decide_value!(writer_data_lifecycle, WriterDataLifecycle),
        }
    }
}

/// Builder of PublisherQosPolicies
#[derive(Default)]
pub struct PublisherQosBuilder {
    presentation: Option<Presentation>,
    partition: Option<Partition>,
    group_data: Option<GroupData>,
    entity_factory: Option<EntityFactory>,
}

impl PublisherQosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    builder_method!(presentation, Presentation);
    builder_method!(partition, Partition);
    builder_method!(group_data, GroupData);
    builder_method!(entity_factory, EntityFactory);

    pub fn build(self) -> PublisherQosPolicies {
        PublisherQosPolicies {
            presentation: self.presentation.unwrap_or_default(),
            partition: self.partition.unwrap_or_default(),
            group_data: self.group_data.unwrap_or_default(),
            entity_factory: self.entity_factory.unwrap_or_default(),
        }
    }
}

/// Builder of DataReaderQosPolicies
#[derive(Default)]
pub struct DataReaderQosBuilder {
    durability: Option<Durability>,
    deadline: Option<Deadline>,
    latency_budget: Option<LatencyBudget>,
    liveliness: Option<Liveliness>,
    reliability: Option<Reliability>,
    destination_order: Option<DestinationOrder>,
    history: Option<History>,
    resource_limits: Option<ResourceLimits>,
    user_data: Option<UserData>,
    ownership: Option<Ownership>,
    time_based_filter: Option<TimeBasedFilter>,
    reader_data_lifecycle: Option<ReaderDataLifecycle>,
}

impl DataReaderQosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    builder_method!(durability, Durability);
    builder_method!(deadline, Deadline);
    builder_method!(latency_budget, LatencyBudget);
    builder_method!(liveliness, Liveliness);
    builder_method!(reliability, Reliability);
    builder_method!(destination_order, DestinationOrder);
    builder_method!(history, History);
    builder_method!(resource_limits, ResourceLimits);
    builder_method!(user_data, UserData);
    builder_method!(ownership, Ownership);
    builder_method!(time_based_filter, TimeBasedFilter);
    builder_method!(reader_data_lifecycle, ReaderDataLifecycle);

    pub fn build(self) -> DataReaderQosPolicies {
        macro_rules! decide_value {
            ($name:ident, $type:ident) => {
                match self.$name {
                    Some(qos_policy) => (qos_policy, true),
                    None => ($type::default(), false),
                }
            };
        }
        DataReaderQosPolicies {
            durability: decide_value!(durability, Durability),
            deadline: decide_value!(deadline, Deadline),
            latency_budget: decide_value!(latency_budget, LatencyBudget),
            liveliness: decide_value!(liveliness, Liveliness),
            reliability: match self.reliability {
                Some(reliability) => (reliability, true),
                None => (Reliability::default_besteffort(), false),
            },
            destination_order: decide_value!(destination_order, DestinationOrder),
            history: decide_value!(history, History),
            resource_limits: decide_value!(resource_limits, ResourceLimits),
            user_data: decide_value!(user_data, UserData),
            ownership: decide_value!(ownership, Ownership),
            time_based_filter: decide_value!(time_based_filter, TimeBasedFilter),
            reader_data_lifecycle: decide_value!(reader_data_lifecycle, ReaderDataLifecycle),
        }
    }
}

/// Builder of SubscriberQosPolicies
#[derive(Default)]
pub struct SubscriberQosBuilder {
    presentation: Option<Presentation>,
    partition: Option<Partition>,
    group_data: Option<GroupData>,
    entity_factory: Option<EntityFactory>,
}

impl SubscriberQosBuilder {
    pub fn new() -> Self {
        SubscriberQosBuilder::default()
    }

    builder_method!(presentation, Presentation);
    builder_method!(partition, Partition);
    builder_method!(group_data, GroupData);
    builder_method!(entity_factory, EntityFactory);

    pub fn build(self) -> SubscriberQosPolicies {
        SubscriberQosPolicies {
            presentation: self.presentation.unwrap_or_default(),
            partition: self.partition.unwrap_or_default(),
            group_data: self.group_data.unwrap_or_default(),
            entity_factory: self.entity_factory.unwrap_or_default(),
        }
    }
}

pub mod policy {
    //! DDS QoS policies
    //!
    //! For more details on each QoS policy, please refer to the DDS specification.
    //! DDS v1.4 spec, 2.2.3 Supported QoS (<https://www.omg.org/spec/DDS/1.4/PDF#G5.1034386>)
    use crate::error::{DdsError, DdsResult};
    use crate::structure::Duration;
    use serde::{Deserialize, Serialize};
    use serde_repr::{Deserialize_repr, Serialize_repr};

    // Default value of QoS Policies is on DDS v1.4 spec 2.2.3 Supported QoS
    pub const LENGTH_UNLIMITED: i32 = -1;

    fn check_limit(name: &str, value: i32) -> DdsResult<()> {
        if value == LENGTH_UNLIMITED || value > 0 {
            Ok(())
        } else {
            Err(DdsError::InconsistentPolicy(format!(
                "{} must be positive or LENGTH_UNLIMITED, got {}",
                name, value
            )))
        }
    }

    /// `a` <= `b` where LENGTH_UNLIMITED is the largest value
    fn limit_le(a: i32, b: i32) -> bool {
        match (a, b) {
            (_, LENGTH_UNLIMITED) => true,
            (LENGTH_UNLIMITED, _) => false,
            (a, b) => a <= b,
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct DurabilityService {
        pub service_cleanup_delay: Duration,
        pub history_kind: HistoryQosKind,
        pub history_depth: i32,
        pub max_samples: i32,
        pub max_instances: i32,
        pub max_samples_per_instance: i32,
    }
    impl DurabilityService {
        pub(crate) fn validate(&self) -> DdsResult<()> {
            History::validate_with_limits(
                &History {
                    kind: self.history_kind,
                    depth: self.history_depth,
                },
                &ResourceLimits {
                    max_samples: self.max_samples,
                    max_instances: self.max_instances,
                    max_samples_per_instance: self.max_samples_per_instance,
                },
            )
        }
    }
    impl Default for DurabilityService {
        fn default() -> Self {
            Self {
                service_cleanup_delay: Duration::ZERO,
                history_kind: HistoryQosKind::KeepLast,
                history_depth: 1,
                max_samples: LENGTH_UNLIMITED,
                max_instances: LENGTH_UNLIMITED,
                max_samples_per_instance: LENGTH_UNLIMITED,
            }
        }
    }

    /// Durability QoS policy
    ///
    /// "Transient" and "Persistent" are recognized but need a durability
    /// service, so entities requesting them are rejected as Unsupported.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum Durability {
        Volatile = 0,
        TransientLocal = 1,
        Transient = 2,
        Persistent = 3,
    }
    impl Durability {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered as usize >= requested as usize
        }

        pub(crate) fn check_supported(&self) -> DdsResult<()> {
            match self {
                Self::Volatile | Self::TransientLocal => Ok(()),
                _ => Err(DdsError::Unsupported(format!(
                    "durability {:?} requires a durability service",
                    self
                ))),
            }
        }
    }
    impl Default for Durability {
        fn default() -> Self {
            Self::Volatile
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Presentation {
        pub access_scope: PresentationQosAccessScopeKind,
        pub coherent_access: bool,
        pub ordered_access: bool,
    }
    impl Presentation {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered.access_scope as usize >= requested.access_scope as usize
                && (offered.coherent_access || !requested.coherent_access)
                && (offered.ordered_access || !requested.ordered_access)
        }

        pub(crate) fn check_supported(&self) -> DdsResult<()> {
            if self.access_scope == PresentationQosAccessScopeKind::Group && self.coherent_access {
                Err(DdsError::Unsupported(
                    "coherent access with GROUP access scope".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
    #[allow(clippy::derivable_impls)]
    impl Default for Presentation {
        fn default() -> Self {
            Self {
                access_scope: PresentationQosAccessScopeKind::default(),
                coherent_access: false,
                ordered_access: false,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum PresentationQosAccessScopeKind {
        Instance = 0,
        Topic = 1,
        Group = 2,
    }
    impl Default for PresentationQosAccessScopeKind {
        fn default() -> Self {
            Self::Instance
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Deadline {
        pub period: Duration,
    }
    impl Deadline {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered.period <= requested.period
        }

        pub(crate) fn validate(&self) -> DdsResult<()> {
            if self.period.is_zero() || self.period.seconds < 0 {
                Err(DdsError::InconsistentPolicy(format!(
                    "deadline period must be positive, got {:?}",
                    self.period
                )))
            } else {
                Ok(())
            }
        }
    }
    impl Default for Deadline {
        fn default() -> Self {
            Self {
                period: Duration::INFINITE,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct LatencyBudget(pub Duration);
    impl LatencyBudget {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered.0 <= requested.0
        }
    }
    impl Default for LatencyBudget {
        fn default() -> Self {
            Self(Duration::ZERO)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum Ownership {
        Shared = 0,
        Exclusive = 1,
    }
    impl Ownership {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered as usize == requested as usize
        }
    }
    impl Default for Ownership {
        fn default() -> Self {
            Self::Shared
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct OwnershipStrength(pub i32);
    #[allow(clippy::derivable_impls)]
    impl Default for OwnershipStrength {
        fn default() -> Self {
            Self(0)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Liveliness {
        pub kind: LivelinessQosKind,
        pub lease_duration: Duration,
    }
    impl Liveliness {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered.kind as usize >= requested.kind as usize
                && offered.lease_duration <= requested.lease_duration
        }

        pub(crate) fn validate(&self) -> DdsResult<()> {
            if self.lease_duration.is_zero() || self.lease_duration.seconds < 0 {
                Err(DdsError::InconsistentPolicy(format!(
                    "liveliness lease_duration must be positive, got {:?}",
                    self.lease_duration
                )))
            } else {
                Ok(())
            }
        }
    }
    impl Default for Liveliness {
        fn default() -> Self {
            Self {
                kind: LivelinessQosKind::Automatic,
                lease_duration: Duration::INFINITE,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum LivelinessQosKind {
        Automatic = 0,
        ManualByParticipant = 1,
        ManualByTopic = 2,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TimeBasedFilter {
        pub minimum_separation: Duration,
    }
    impl Default for TimeBasedFilter {
        fn default() -> Self {
            Self {
                minimum_separation: Duration::ZERO,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Reliability {
        pub kind: ReliabilityQosKind,
        pub max_blocking_time: Duration,
    }
    impl Reliability {
        // DDS v1.4 spec, 2.2.3 Supported QoS specifies
        // default value of max_blocking_time is 100ms

        pub fn default_besteffort() -> Self {
            Self {
                kind: ReliabilityQosKind::BestEffort,
                max_blocking_time: Duration::from_millis(100),
            }
        }
        pub fn default_reliable() -> Self {
            Self {
                kind: ReliabilityQosKind::Reliable,
                max_blocking_time: Duration::from_millis(100),
            }
        }

        pub fn is_reliable(&self) -> bool {
            self.kind == ReliabilityQosKind::Reliable
        }

        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered.kind as usize >= requested.kind as usize
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum ReliabilityQosKind {
        Reliable = 2,
        BestEffort = 1,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum DestinationOrder {
        ByReceptionTimestamp = 0,
        BySourceTimestamp = 1,
    }
    impl DestinationOrder {
        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: Self, requested: Self) -> bool {
            offered as usize >= requested as usize
        }
    }
    impl Default for DestinationOrder {
        fn default() -> Self {
            Self::ByReceptionTimestamp
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct History {
        pub kind: HistoryQosKind,
        pub depth: i32,
    }
    impl History {
        pub(crate) fn validate_with_limits(
            history: &History,
            limits: &ResourceLimits,
        ) -> DdsResult<()> {
            check_limit("max_samples", limits.max_samples)?;
            check_limit("max_instances", limits.max_instances)?;
            check_limit("max_samples_per_instance", limits.max_samples_per_instance)?;
            if !limit_le(limits.max_samples_per_instance, limits.max_samples) {
                return Err(DdsError::InconsistentPolicy(format!(
                    "max_samples ({}) is less than max_samples_per_instance ({})",
                    limits.max_samples, limits.max_samples_per_instance
                )));
            }
            if history.kind == HistoryQosKind::KeepLast {
                if history.depth < 1 {
                    return Err(DdsError::InconsistentPolicy(format!(
                        "KeepLast history depth must be at least 1, got {}",
                        history.depth
                    )));
                }
                if !limit_le(history.depth, limits.max_samples_per_instance) {
                    return Err(DdsError::InconsistentPolicy(format!(
                        "history depth ({}) exceeds max_samples_per_instance ({})",
                        history.depth, limits.max_samples_per_instance
                    )));
                }
            }
            Ok(())
        }
    }
    impl Default for History {
        fn default() -> Self {
            Self {
                kind: HistoryQosKind::KeepLast,
                depth: 1,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
    #[repr(i32)]
    pub enum HistoryQosKind {
        KeepLast = 0,
        KeepAll = 1,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ResourceLimits {
        pub max_samples: i32,
        pub max_instances: i32,
        pub max_samples_per_instance: i32,
    }
    impl Default for ResourceLimits {
        fn default() -> Self {
            Self {
                max_samples: LENGTH_UNLIMITED,
                max_instances: LENGTH_UNLIMITED,
                max_samples_per_instance: LENGTH_UNLIMITED,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Lifespan(pub Duration);
    impl Default for Lifespan {
        fn default() -> Self {
            Self(Duration::INFINITE)
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Partition {
        pub name: Vec<String>,
    }
    impl Partition {
        fn names(&self) -> Vec<&str> {
            if self.name.is_empty() {
                // an empty sequence means the default partition
                vec![""]
            } else {
                self.name.iter().map(String::as_str).collect()
            }
        }

        /// offered is Publisher side QoS value
        /// requested is Subscriber side QoS value
        pub(crate) fn is_compatible(offered: &Self, requested: &Self) -> bool {
            let offered = offered.names();
            let requested = requested.names();
            offered
                .iter()
                .any(|o| requested.iter().any(|r| partition_matches(o, r)))
        }
    }
    impl Default for Partition {
        fn default() -> Self {
            Self {
                name: vec![String::new()],
            }
        }
    }

    fn has_wildcard(name: &str) -> bool {
        name.contains(['*', '?'])
    }

    // two patterns never match each other
    fn partition_matches(a: &str, b: &str) -> bool {
        match (has_wildcard(a), has_wildcard(b)) {
            (false, false) => a == b,
            (true, false) => glob_match(a.as_bytes(), b.as_bytes()),
            (false, true) => glob_match(b.as_bytes(), a.as_bytes()),
            (true, true) => false,
        }
    }

    fn glob_match(pattern: &[u8], name: &[u8]) -> bool {
        match (pattern.first(), name.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                glob_match(&pattern[1..], name)
                    || (!name.is_empty() && glob_match(pattern, &name[1..]))
            }
            (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &name[1..]),
            (Some(p), Some(n)) if p == n => glob_match(&pattern[1..], &name[1..]),
            _ => false,
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct UserData {
        pub value: Vec<u8>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct TopicData {
        pub value: Vec<u8>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct GroupData {
        pub value: Vec<u8>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct WriterDataLifecycle {
        pub autodispose_unregistered_instances: bool,
    }
    impl Default for WriterDataLifecycle {
        fn default() -> Self {
            Self {
                autodispose_unregistered_instances: true,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ReaderDataLifecycle {
        pub autopurge_nowriter_samples_delay: Duration,
        pub autopurge_disposed_samples_delay: Duration,
    }
    impl Default for ReaderDataLifecycle {
        fn default() -> Self {
            Self {
                autopurge_disposed_samples_delay: Duration::INFINITE,
                autopurge_nowriter_samples_delay: Duration::INFINITE,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransportPriority {
        pub value: i32,
    }
    #[allow(clippy::derivable_impls)]
    impl Default for TransportPriority {
        fn default() -> Self {
            Self { value: 0 }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct EntityFactory {
        pub autoenable_created_entities: bool,
    }
    impl Default for EntityFactory {
        fn default() -> Self {
            Self {
                autoenable_created_entities: true,
            }
        }
    }

    /// participant liveliness as seen by remote participants
    ///
    /// the participant re-announces itself every `announcement_period`;
    /// remote participants consider it lost after `lease_duration` of silence.
    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct DiscoveryConfig {
        pub lease_duration: Duration,
        pub announcement_period: Duration,
    }
    impl DiscoveryConfig {
        pub(crate) fn validate(&self) -> DdsResult<()> {
            if self.lease_duration.is_zero() || self.lease_duration.seconds < 0 {
                return Err(DdsError::InconsistentPolicy(format!(
                    "lease_duration must be positive, got {:?}",
                    self.lease_duration
                )));
            }
            if self.announcement_period.is_zero()
                || self.announcement_period.seconds < 0
                || self.announcement_period.is_infinite()
            {
                return Err(DdsError::InconsistentPolicy(format!(
                    "announcement_period must be positive and finite, got {:?}",
                    self.announcement_period
                )));
            }
            if self.announcement_period >= self.lease_duration {
                return Err(DdsError::InconsistentPolicy(format!(
                    "announcement_period {:?} must be shorter than lease_duration {:?}",
                    self.announcement_period, self.lease_duration
                )));
            }
            Ok(())
        }
    }
    impl Default for DiscoveryConfig {
        fn default() -> Self {
            Self {
                lease_duration: Duration::from_secs(20),
                announcement_period: Duration::from_secs(3),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structure::Duration;
    use cdr::{CdrLe, Infinite};

    #[test]
    fn test_combine() {
        let topic_qos = TopicQosBuilder::new()
            .durability(policy::Durability::Volatile)
            .liveliness(policy::Liveliness {
                kind: policy::LivelinessQosKind::ManualByTopic,
                lease_duration: Duration::new(10, 0),
            })
            .build();
        assert_eq!(topic_qos.history, (policy::History::default(), false));
        let dw_qos = DataWriterQosBuilder::new()
            .durability(policy::Durability::TransientLocal)
            .history(policy::History {
                kind: policy::HistoryQosKind::KeepLast,
                depth: 1,
            })
            .reliability(policy::Reliability::default_besteffort())
            .build();
        let mut dw_qos_combined = topic_qos.to_datawriter_qos();
        assert_eq!(dw_qos_combined.history, (policy::History::default(), false));
        dw_qos_combined.combine(dw_qos);
        assert_eq!(
            dw_qos_combined.durability,
            (policy::Durability::TransientLocal, true)
        );
        assert_eq!(dw_qos_combined.history, (policy::History::default(), true));
        // same value as the topic, now explicitly set
        assert_eq!(
            dw_qos_combined.reliability,
            (policy::Reliability::default_besteffort(), true)
        );
        assert_eq!(
            dw_qos_combined.deadline,
            (policy::Deadline::default(), false)
        );
        assert_eq!(
            dw_qos_combined.liveliness,
            (
                policy::Liveliness {
                    kind: policy::LivelinessQosKind::ManualByTopic,
                    lease_duration: Duration::new(10, 0),
                },
                true
            )
        );
    }

    #[test]
    fn test_validate_is_idempotent() {
        let bad = DataWriterQosBuilder::new()
            .history(policy::History {
                kind: policy::HistoryQosKind::KeepLast,
                depth: 10,
            })
            .resource_limits(policy::ResourceLimits {
                max_samples: 100,
                max_instances: 1,
                max_samples_per_instance: 5,
            })
            .build();
        let before = bad.clone();
        for _ in 0..3 {
            assert!(matches!(
                validate(&bad),
                Err(DdsError::InconsistentPolicy(_))
            ));
        }
        assert_eq!(bad, before);

        let good = DataWriterQosPolicies::default();
        assert!(validate(&good).is_ok());
        assert!(validate(&good).is_ok());
    }

    #[test]
    fn test_validate_rules() {
        let zero_depth = DataReaderQosBuilder::new()
            .history(policy::History {
                kind: policy::HistoryQosKind::KeepLast,
                depth: 0,
            })
            .build();
        assert!(matches!(
            zero_depth.validate(),
            Err(DdsError::InconsistentPolicy(_))
        ));

        let keep_all = DataReaderQosBuilder::new()
            .history(policy::History {
                kind: policy::HistoryQosKind::KeepAll,
                depth: 0,
            })
            .build();
        assert!(keep_all.validate().is_ok());

        let per_instance_over_total = DataReaderQosBuilder::new()
            .resource_limits(policy::ResourceLimits {
                max_samples: 2,
                max_instances: policy::LENGTH_UNLIMITED,
                max_samples_per_instance: 4,
            })
            .build();
        assert!(matches!(
            per_instance_over_total.validate(),
            Err(DdsError::InconsistentPolicy(_))
        ));

        let filter_over_deadline = DataReaderQosBuilder::new()
            .deadline(policy::Deadline {
                period: Duration::from_millis(100),
            })
            .time_based_filter(policy::TimeBasedFilter {
                minimum_separation: Duration::from_secs(1),
            })
            .build();
        assert!(matches!(
            filter_over_deadline.validate(),
            Err(DdsError::InconsistentPolicy(_))
        ));

        let transient = DataWriterQosBuilder::new()
            .durability(policy::Durability::Persistent)
            .build();
        assert!(matches!(
            transient.validate(),
            Err(DdsError::Unsupported(_))
        ));

        let group_coherent = PublisherQosBuilder::new()
            .presentation(policy::Presentation {
                access_scope: policy::PresentationQosAccessScopeKind::Group,
                coherent_access: true,
                ordered_access: false,
            })
            .build();
        assert!(matches!(
            group_coherent.validate(),
            Err(DdsError::Unsupported(_))
        ));

        let slow_announcement = DomainParticipantQosBuilder::new()
            .discovery_config(policy::DiscoveryConfig {
                lease_duration: Duration::from_secs(2),
                announcement_period: Duration::from_secs(2),
            })
            .build();
        assert!(matches!(
            slow_announcement.validate(),
            Err(DdsError::InconsistentPolicy(_))
        ));
    }

    #[test]
    fn test_immutable_policies() {
        let current = DataWriterQosPolicies::default();
        let mut changed = current.clone();
        changed.set_reliability(policy::Reliability::default_besteffort());
        assert!(matches!(
            changed.check_immutable(&current),
            Err(DdsError::ImmutablePolicy(_))
        ));

        let mut mutable = current.clone();
        mutable.set_deadline(policy::Deadline {
            period: Duration::from_secs(1),
        });
        mutable.set_user_data(policy::UserData { value: vec![1] });
        assert!(mutable.check_immutable(&current).is_ok());

        let pub_qos = PublisherQosPolicies::default();
        let mut partitioned = pub_qos.clone();
        partitioned.set_partition(policy::Partition {
            name: vec!["a".to_string()],
        });
        assert!(partitioned.check_immutable(&pub_qos).is_ok());
    }

    #[test]
    fn test_reliability_compatibility() {
        use policy::Reliability;
        let table = [
            (Reliability::default_reliable(), Reliability::default_reliable(), true),
            (Reliability::default_reliable(), Reliability::default_besteffort(), true),
            (Reliability::default_besteffort(), Reliability::default_besteffort(), true),
            (Reliability::default_besteffort(), Reliability::default_reliable(), false),
        ];
        for (offered, requested, expected) in table {
            let w = DataWriterQosBuilder::new().reliability(offered).build();
            let r = DataReaderQosBuilder::new().reliability(requested).build();
            assert_eq!(w.is_compatible(&r).is_ok(), expected);
            if !expected {
                assert_eq!(w.is_compatible(&r), Err(vec![QosPolicyId::Reliability]));
                assert_eq!(r.is_compatible(&w), Err(vec![QosPolicyId::Reliability]));
            }
        }
    }

    #[test]
    fn test_incompatible_policies_are_all_reported() {
        let w = DataWriterQosBuilder::new()
            .durability(policy::Durability::Volatile)
            .deadline(policy::Deadline {
                period: Duration::from_secs(2),
            })
            .build();
        let r = DataReaderQosBuilder::new()
            .durability(policy::Durability::TransientLocal)
            .deadline(policy::Deadline {
                period: Duration::from_secs(1),
            })
            .build();
        assert_eq!(
            w.is_compatible(&r),
            Err(vec![QosPolicyId::Durability, QosPolicyId::Deadline])
        );
    }

    #[test]
    fn test_partition_compatibility() {
        let part = |names: &[&str]| policy::Partition {
            name: names.iter().map(|s| s.to_string()).collect(),
        };
        let p = |names: &[&str]| PublisherQosBuilder::new().partition(part(names)).build();
        let s = |names: &[&str]| SubscriberQosBuilder::new().partition(part(names)).build();

        assert!(p(&[""]).is_compatible(&s(&[])).is_ok());
        assert!(p(&["a", "b"]).is_compatible(&s(&["b"])).is_ok());
        assert!(p(&["sensor/*"]).is_compatible(&s(&["sensor/lidar"])).is_ok());
        assert_eq!(
            p(&["a"]).is_compatible(&s(&["c"])),
            Err(vec![QosPolicyId::Partition])
        );
        assert_eq!(
            p(&["a*"]).is_compatible(&s(&["a*"])),
            Err(vec![QosPolicyId::Partition])
        );
    }

    #[test]
    fn test_serialize() {
        let history = policy::History {
            kind: policy::HistoryQosKind::KeepAll,
            depth: 100,
        };
        let serialized = cdr::serialize::<_, _, CdrLe>(&history, Infinite).unwrap();
        assert_eq!(
            serialized,
            vec![0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00]
        );
        let qos = DataWriterQosPolicies::default();
        let serialized = cdr::serialize::<_, _, CdrLe>(&qos, Infinite).unwrap();
        let deserialized = cdr::deserialize::<DataWriterQosPolicies>(&serialized).unwrap();
        assert_eq!(qos, deserialized);
    }
}
