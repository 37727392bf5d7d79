//! Customer ↔ supplier eligibility.
//!
//! An association states that a customer may order from a supplier. Rows are
//! soft-toggled rather than deleted so order history keeps its counterpart.

pub mod association;
pub mod batch;

pub use association::{
    ActivateAssociation, Association, AssociationActivated, AssociationCommand,
    AssociationCreated, AssociationDeactivated, AssociationDeleted, AssociationEvent,
    AssociationId, CreateAssociation, DeactivateAssociation, DeleteAssociation, pair_key,
};
pub use batch::{AssociationReport, BatchPlan, EnsureOutcome, plan_supplier_set};
