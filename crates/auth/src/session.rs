//! Session boundary: who is acting, and through which portal.

use tradegate_core::UserId;

use crate::{AuthzError, Portal, Principal};

/// Supplies the acting principal for the current request.
///
/// The engine performs no authentication; it trusts what this returns.
pub trait IdentityProvider: Send + Sync {
    fn current_principal(&self) -> Option<Principal>;

    /// Drop the current session (sign the user out).
    fn revoke_session(&self);
}

/// Resolves user ids to live accounts (used by maintenance tasks).
pub trait UserDirectory: Send + Sync {
    fn exists(&self, user_id: UserId) -> bool;
}

/// Resolve the acting principal for a portal.
///
/// When the account's stored role does not match the portal the session is
/// revoked before the error is returned, so the client never keeps a
/// half-authenticated session.
pub fn open_session<P>(provider: &P, portal: Portal) -> Result<Principal, AuthzError>
where
    P: IdentityProvider + ?Sized,
{
    let principal = provider.current_principal().ok_or(AuthzError::NoSession)?;

    let expected = portal.expected_role();
    if principal.role != expected {
        tracing::warn!(
            user_id = %principal.user_id,
            expected = %expected,
            actual = %principal.role,
            "portal role mismatch; revoking session"
        );
        provider.revoke_session();
        return Err(AuthzError::RoleMismatch {
            expected,
            actual: principal.role,
        });
    }

    Ok(principal)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Role;

    struct FakeIdentity {
        session: Mutex<Option<Principal>>,
    }

    impl FakeIdentity {
        fn signed_in(principal: Principal) -> Self {
            Self {
                session: Mutex::new(Some(principal)),
            }
        }
    }

    impl IdentityProvider for FakeIdentity {
        fn current_principal(&self) -> Option<Principal> {
            self.session.lock().unwrap().clone()
        }

        fn revoke_session(&self) {
            *self.session.lock().unwrap() = None;
        }
    }

    #[test]
    fn matching_portal_opens_session() {
        let identity = FakeIdentity::signed_in(Principal::customer(UserId::new(), "Bistro"));
        let principal = open_session(&identity, Portal::Customer).unwrap();
        assert_eq!(principal.role, Role::Customer);
        assert!(identity.current_principal().is_some());
    }

    #[test]
    fn role_mismatch_revokes_session() {
        let identity = FakeIdentity::signed_in(Principal::customer(UserId::new(), "Bistro"));

        let err = open_session(&identity, Portal::Supplier).unwrap_err();

        assert_eq!(
            err,
            AuthzError::RoleMismatch {
                expected: Role::Supplier,
                actual: Role::Customer,
            }
        );
        assert!(identity.current_principal().is_none());
        assert_eq!(
            open_session(&identity, Portal::Customer),
            Err(AuthzError::NoSession)
        );
    }
}
