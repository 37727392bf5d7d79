use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, PartyRef, UserId, aggregate_id, persisted,
};
use tradegate_events::Event;

aggregate_id!(
    /// Association identifier.
    AssociationId
);

/// Uniqueness key of a (customer, supplier) pair.
pub fn pair_key(customer_id: UserId, supplier_id: UserId) -> String {
    format!("{customer_id}:{supplier_id}")
}

/// Aggregate root: Association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    id: AssociationId,
    customer: PartyRef,
    supplier: PartyRef,
    is_active: bool,
    notes: Option<String>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing, default = "persisted")]
    created: bool,
}

impl Association {
    pub fn empty(id: AssociationId) -> Self {
        Self {
            id,
            customer: PartyRef::new(UserId::nil(), ""),
            supplier: PartyRef::new(UserId::nil(), ""),
            is_active: false,
            notes: None,
            created_by: UserId::nil(),
            created_at: DateTime::<Utc>::MIN_UTC,
            created: false,
        }
    }

    pub fn id_typed(&self) -> AssociationId {
        self.id
    }

    pub fn customer(&self) -> &PartyRef {
        &self.customer
    }

    pub fn supplier(&self) -> &PartyRef {
        &self.supplier
    }

    pub fn customer_id(&self) -> UserId {
        self.customer.id
    }

    pub fn supplier_id(&self) -> UserId {
        self.supplier.id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pair_key(&self) -> String {
        pair_key(self.customer.id, self.supplier.id)
    }
}

impl AggregateRoot for Association {
    type Id = AssociationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateAssociation (new rows start active).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAssociation {
    pub association_id: AssociationId,
    pub customer: PartyRef,
    pub supplier: PartyRef,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateAssociation {
    pub association_id: AssociationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateAssociation {
    pub association_id: AssociationId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteAssociation (explicit hard removal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAssociation {
    pub association_id: AssociationId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationCommand {
    CreateAssociation(CreateAssociation),
    ActivateAssociation(ActivateAssociation),
    DeactivateAssociation(DeactivateAssociation),
    DeleteAssociation(DeleteAssociation),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationCreated {
    pub association_id: AssociationId,
    pub customer: PartyRef,
    pub supplier: PartyRef,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationActivated {
    pub association_id: AssociationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDeactivated {
    pub association_id: AssociationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDeleted {
    pub association_id: AssociationId,
    pub customer_id: UserId,
    pub supplier_id: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationEvent {
    AssociationCreated(AssociationCreated),
    AssociationActivated(AssociationActivated),
    AssociationDeactivated(AssociationDeactivated),
    AssociationDeleted(AssociationDeleted),
}

impl Event for AssociationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AssociationEvent::AssociationCreated(_) => "associations.association.created",
            AssociationEvent::AssociationActivated(_) => "associations.association.activated",
            AssociationEvent::AssociationDeactivated(_) => "associations.association.deactivated",
            AssociationEvent::AssociationDeleted(_) => "associations.association.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AssociationEvent::AssociationCreated(e) => e.occurred_at,
            AssociationEvent::AssociationActivated(e) => e.occurred_at,
            AssociationEvent::AssociationDeactivated(e) => e.occurred_at,
            AssociationEvent::AssociationDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Association {
    type Command = AssociationCommand;
    type Event = AssociationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AssociationEvent::AssociationCreated(e) => {
                self.id = e.association_id;
                self.customer = e.customer.clone();
                self.supplier = e.supplier.clone();
                self.is_active = true;
                self.notes = e.notes.clone();
                self.created_by = e.created_by;
                self.created_at = e.occurred_at;
                self.created = true;
            }
            AssociationEvent::AssociationActivated(_) => {
                self.is_active = true;
            }
            AssociationEvent::AssociationDeactivated(_) => {
                self.is_active = false;
            }
            // The row is removed from storage; in memory it stops granting access.
            AssociationEvent::AssociationDeleted(_) => {
                self.is_active = false;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AssociationCommand::CreateAssociation(cmd) => self.handle_create(cmd),
            AssociationCommand::ActivateAssociation(cmd) => {
                self.ensure_exists(cmd.association_id)?;
                if self.is_active {
                    return Ok(vec![]);
                }
                Ok(vec![AssociationEvent::AssociationActivated(
                    AssociationActivated {
                        association_id: cmd.association_id,
                        occurred_at: cmd.occurred_at,
                    },
                )])
            }
            AssociationCommand::DeactivateAssociation(cmd) => {
                self.ensure_exists(cmd.association_id)?;
                if !self.is_active {
                    return Ok(vec![]);
                }
                Ok(vec![AssociationEvent::AssociationDeactivated(
                    AssociationDeactivated {
                        association_id: cmd.association_id,
                        occurred_at: cmd.occurred_at,
                    },
                )])
            }
            AssociationCommand::DeleteAssociation(cmd) => {
                self.ensure_exists(cmd.association_id)?;
                Ok(vec![AssociationEvent::AssociationDeleted(AssociationDeleted {
                    association_id: cmd.association_id,
                    customer_id: self.customer.id,
                    supplier_id: self.supplier.id,
                    reason: cmd.reason.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Association {
    fn ensure_exists(&self, association_id: AssociationId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found("association"));
        }
        if self.id != association_id {
            return Err(DomainError::invariant("association_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateAssociation) -> DomainResult<Vec<AssociationEvent>> {
        if self.created {
            return Err(DomainError::conflict("association already exists"));
        }
        if cmd.customer.id == cmd.supplier.id {
            return Err(DomainError::validation(
                "customer and supplier must be different accounts",
            ));
        }
        if cmd.customer.name.trim().is_empty() || cmd.supplier.name.trim().is_empty() {
            return Err(DomainError::validation("party names cannot be empty"));
        }

        Ok(vec![AssociationEvent::AssociationCreated(AssociationCreated {
            association_id: cmd.association_id,
            customer: cmd.customer.clone(),
            supplier: cmd.supplier.clone(),
            notes: cmd.notes.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
