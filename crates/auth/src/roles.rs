use serde::{Deserialize, Serialize};

/// Role stored on a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supplier,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supplier => "supplier",
            Role::Customer => "customer",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The portal (sign-in tab) a session was opened through.
///
/// Each portal admits exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Admin,
    Supplier,
    Customer,
}

impl Portal {
    pub fn expected_role(&self) -> Role {
        match self {
            Portal::Admin => Role::Admin,
            Portal::Supplier => Role::Supplier,
            Portal::Customer => Role::Customer,
        }
    }
}
