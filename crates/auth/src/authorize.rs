use thiserror::Error;

use tradegate_core::UserId;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no active session")]
    NoSession,

    #[error("role mismatch: portal expects '{expected}', account is '{actual}'")]
    RoleMismatch { expected: Role, actual: Role },

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: {0} belongs to another account")]
    NotOwner(String),
}

/// Check a principal against the role policy.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Require an exact role (admins are not implicitly admitted).
pub fn ensure_role(principal: &Principal, role: Role) -> Result<(), AuthzError> {
    if principal.role == role {
        Ok(())
    } else {
        Err(AuthzError::RoleMismatch {
            expected: role,
            actual: principal.role,
        })
    }
}

/// Admins act on anything; everyone else only on records they own.
pub fn ensure_owner(principal: &Principal, owner: UserId, what: &str) -> Result<(), AuthzError> {
    if principal.is_admin() || principal.user_id == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner(what.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_wildcard_grants_everything() {
        let admin = Principal::admin(UserId::new(), "Ops");
        assert!(authorize(&admin, &Permission::ORDERS_APPROVE).is_ok());
        assert!(authorize(&admin, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn supplier_cannot_approve_orders() {
        let supplier = Principal::supplier(UserId::new(), "Fishery");
        assert!(authorize(&supplier, &Permission::ORDERS_FULFIL).is_ok());
        assert_eq!(
            authorize(&supplier, &Permission::ORDERS_APPROVE),
            Err(AuthzError::Forbidden("orders.approve".to_string()))
        );
    }

    #[test]
    fn customer_cannot_write_price_lists() {
        let customer = Principal::customer(UserId::new(), "Bistro");
        assert!(authorize(&customer, &Permission::ORDERS_PLACE).is_ok());
        assert!(authorize(&customer, &Permission::PRICE_LISTS_WRITE).is_err());
    }

    #[test]
    fn ownership_is_checked_for_non_admins() {
        let supplier = Principal::supplier(UserId::new(), "Fishery");
        let other = UserId::new();
        assert!(ensure_owner(&supplier, supplier.user_id, "price list").is_ok());
        assert_eq!(
            ensure_owner(&supplier, other, "price list"),
            Err(AuthzError::NotOwner("price list".to_string()))
        );

        let admin = Principal::admin(UserId::new(), "Ops");
        assert!(ensure_owner(&admin, other, "price list").is_ok());
    }

    #[test]
    fn ensure_role_is_exact() {
        let admin = Principal::admin(UserId::new(), "Ops");
        assert!(ensure_role(&admin, Role::Customer).is_err());
    }
}
