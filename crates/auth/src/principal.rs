use serde::{Deserialize, Serialize};

use tradegate_core::{PartyRef, UserId};

use crate::{Permission, Role, role_permissions};

/// The acting user for the current request, as supplied by the identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub display_name: String,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            display_name: display_name.into(),
        }
    }

    pub fn admin(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin, display_name)
    }

    pub fn supplier(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self::new(user_id, Role::Supplier, display_name)
    }

    pub fn customer(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self::new(user_id, Role::Customer, display_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn permissions(&self) -> Vec<Permission> {
        role_permissions(self.role)
    }

    /// This principal as a counterparty reference.
    pub fn as_party(&self) -> PartyRef {
        PartyRef::new(self.user_id, self.display_name.clone())
    }
}
