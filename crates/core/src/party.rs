use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Reference to a counterparty account (customer or supplier): typed id plus
/// the display name captured at the time of reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: UserId,
    pub name: String,
}

impl PartyRef {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl crate::ValueObject for PartyRef {}
