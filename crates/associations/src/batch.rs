//! Planning for whole-set edits of a customer's suppliers.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use tradegate_core::UserId;

use crate::{Association, AssociationId};

/// What a batch edit will do. Nothing in a plan ever deletes a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// Suppliers with no row for the customer yet.
    pub to_add: Vec<UserId>,
    /// Active rows whose supplier left the target set.
    pub to_deactivate: Vec<AssociationId>,
    /// Inactive rows whose supplier is back in the target set.
    pub to_reactivate: Vec<AssociationId>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_deactivate.is_empty() && self.to_reactivate.is_empty()
    }
}

/// Diff one customer's `current` rows against the `target` supplier set.
pub fn plan_supplier_set(current: &[Association], target: &BTreeSet<UserId>) -> BatchPlan {
    let known: HashSet<UserId> = current.iter().map(|a| a.supplier_id()).collect();

    let to_add = target
        .iter()
        .filter(|s| !known.contains(s))
        .copied()
        .collect();

    let to_deactivate = current
        .iter()
        .filter(|a| a.is_active() && !target.contains(&a.supplier_id()))
        .map(|a| a.id_typed())
        .collect();

    let to_reactivate = current
        .iter()
        .filter(|a| !a.is_active() && target.contains(&a.supplier_id()))
        .map(|a| a.id_typed())
        .collect();

    BatchPlan {
        to_add,
        to_deactivate,
        to_reactivate,
    }
}

/// Result of making sure a single pair is active.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    Created,
    Reactivated,
    AlreadyActive,
}

/// Per-supplier outcome of an association request, grouped by result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationReport {
    pub created: Vec<UserId>,
    pub reactivated: Vec<UserId>,
    pub already_existed: Vec<UserId>,
}

impl AssociationReport {
    pub fn record(&mut self, supplier_id: UserId, outcome: EnsureOutcome) {
        match outcome {
            EnsureOutcome::Created => self.created.push(supplier_id),
            EnsureOutcome::Reactivated => self.reactivated.push(supplier_id),
            EnsureOutcome::AlreadyActive => self.already_existed.push(supplier_id),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}
