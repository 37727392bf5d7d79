//! `tradegate-auth`: role-based authorization boundary.
//!
//! This crate is decoupled from transport and storage: it trusts the
//! principal handed to it by an [`IdentityProvider`] and only answers
//! "may this principal do that?".

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{AuthzError, authorize, ensure_owner, ensure_role};
pub use permissions::{Permission, role_permissions};
pub use principal::Principal;
pub use roles::{Portal, Role};
pub use session::{IdentityProvider, UserDirectory, open_session};
