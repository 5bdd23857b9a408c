use serde_repr::{Deserialize_repr, Serialize_repr};

/// whether the data type of a Topic has a key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum TopicKind {
    NoKey = 1,
    WithKey = 2,
}
