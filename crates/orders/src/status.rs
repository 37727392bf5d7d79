use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tradegate_core::DomainError;

/// Order status lifecycle.
///
/// ```text
/// pending_approval -> pending -> confirmed -> processing -> shipped -> delivered
/// pending_approval -> cancelled
/// {pending, confirmed, processing, shipped} -> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingApproval,
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::PendingApproval,
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingApproval => "pending_approval",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (PendingApproval, Pending)
                | (PendingApproval, Cancelled)
                | (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Confirmed | Processing | Shipped, Cancelled)
        )
    }

    /// Suppliers never see orders that are still awaiting admin approval.
    pub fn visible_to_supplier(&self) -> bool {
        !matches!(self, OrderStatus::PendingApproval)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown order status: {s}")))
    }
}

/// Supplier-facing order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierView {
    /// Everything the supplier may see.
    All,
    /// Orders still in the supplier's queue.
    Active,
    /// Shipped or closed orders.
    History,
}

impl SupplierView {
    pub fn includes(&self, status: OrderStatus) -> bool {
        match self {
            SupplierView::All => status.visible_to_supplier(),
            SupplierView::Active => matches!(
                status,
                OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
            ),
            SupplierView::History => matches!(
                status,
                OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
            ),
        }
    }
}
