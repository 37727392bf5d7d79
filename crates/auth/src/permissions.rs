use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "orders.place"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const CATALOG_WRITE: Permission = Permission(Cow::Borrowed("catalog.write"));
    pub const PRICE_LISTS_READ: Permission = Permission(Cow::Borrowed("price_lists.read"));
    pub const PRICE_LISTS_WRITE: Permission = Permission(Cow::Borrowed("price_lists.write"));
    pub const PRICE_LISTS_APPROVE: Permission = Permission(Cow::Borrowed("price_lists.approve"));
    pub const ASSOCIATIONS_MANAGE: Permission = Permission(Cow::Borrowed("associations.manage"));
    pub const ORDERS_PLACE: Permission = Permission(Cow::Borrowed("orders.place"));
    pub const ORDERS_READ: Permission = Permission(Cow::Borrowed("orders.read"));
    pub const ORDERS_FULFIL: Permission = Permission(Cow::Borrowed("orders.fulfil"));
    pub const ORDERS_APPROVE: Permission = Permission(Cow::Borrowed("orders.approve"));
    pub const NOTIFICATIONS_READ: Permission = Permission(Cow::Borrowed("notifications.read"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role → permission policy.
pub fn role_permissions(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![Permission::WILDCARD],
        Role::Supplier => vec![
            Permission::CATALOG_WRITE,
            Permission::PRICE_LISTS_READ,
            Permission::PRICE_LISTS_WRITE,
            Permission::ORDERS_READ,
            Permission::ORDERS_FULFIL,
        ],
        Role::Customer => vec![
            Permission::PRICE_LISTS_READ,
            Permission::ORDERS_PLACE,
            Permission::ORDERS_READ,
        ],
    }
}
