//! Price list domain module.
//!
//! A supplier's price lists move through draft → pending approval → active →
//! archived. This crate holds the per-list rules (editing windows, legal
//! transitions, duplication); the "at most one active list per supplier"
//! rule spans lists and is enforced where lists are stored.

pub mod price_list;

pub use price_list::{
    Activate, Archive, CreatePriceList, ItemRemoved, ItemUpserted, PriceList, PriceListActivated,
    PriceListArchived, PriceListCommand, PriceListCreated, PriceListDetailsUpdated,
    PriceListEvent, PriceListId, PriceListItem, PriceListStatus, PriceListSubmitted,
    PriceListSummary, RemoveItem, ReturnToDraft, ReturnedToDraft, SetVacSurcharge,
    SubmitForApproval, UpdateDetails, UpsertItem, VacSurchargeSet, derive_name,
};
