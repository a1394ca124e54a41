//! Stock ledger
//!
//! The ledger is the only place `quantity_on_hand` changes. Documents talk
//! to it through [`StockLedger`]; the backend loads a locked snapshot into
//! an [`InMemoryLedger`], lets the document mutate it, and commits the
//! resulting journal with conditional updates.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::StockItem;
use crate::types::DocumentKind;
use crate::workflow::Action;

/// How a document points at a stock row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockRef {
    pub stock_id: Option<Uuid>,
    pub workshop: String,
    pub part_number: String,
}

/// Why a movement happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReason {
    pub kind: DocumentKind,
    pub document_no: String,
    pub action: Action,
}

impl MovementReason {
    pub fn new(kind: DocumentKind, document_no: impl Into<String>, action: Action) -> Self {
        Self {
            kind,
            document_no: document_no.into(),
            action,
        }
    }
}

/// One applied quantity change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub stock_id: Uuid,
    pub workshop: String,
    pub part_number: String,
    pub delta: i32,
    pub quantity_after: i32,
    pub reason: MovementReason,
    pub moved_at: DateTime<Utc>,
}

/// Quantity-on-hand store shared by all documents
pub trait StockLedger {
    /// Workshop that unscoped documents draw from
    fn home_workshop(&self) -> &str;

    fn lookup(&self, stock_id: Uuid) -> WorkflowResult<&StockItem>;

    fn lookup_part(&self, workshop: &str, part_number: &str) -> WorkflowResult<&StockItem>;

    /// Apply a signed delta. A result below zero fails with
    /// `InsufficientStock` and leaves the quantity untouched.
    fn adjust(&mut self, stock_id: Uuid, delta: i32, reason: &MovementReason) -> WorkflowResult<&StockItem>;

    /// Resolve by id when present, otherwise by part number in the ref's
    /// workshop. A missing row is an error, never a silent skip.
    fn resolve(&self, stock_ref: &StockRef) -> WorkflowResult<&StockItem> {
        match stock_ref.stock_id {
            Some(id) => self.lookup(id),
            None => self.lookup_part(&stock_ref.workshop, &stock_ref.part_number),
        }
    }
}

/// Stock a multi-line operation needs from one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDemand {
    pub stock_id: Uuid,
    pub part_number: String,
    pub quantity: i32,
}

/// Check that every row can cover the summed demand against it before
/// anything is deducted. Lines naming the same part add up.
pub fn ensure_available<L: StockLedger + ?Sized>(ledger: &L, demands: &[StockDemand]) -> WorkflowResult<()> {
    let mut totals: BTreeMap<Uuid, (&str, i32)> = BTreeMap::new();
    for demand in demands {
        let entry = totals.entry(demand.stock_id).or_insert((demand.part_number.as_str(), 0));
        entry.1 += demand.quantity;
    }
    for (stock_id, (part_number, requested)) in totals {
        let item = ledger.lookup(stock_id)?;
        if item.quantity_on_hand < requested {
            return Err(WorkflowError::InsufficientStock {
                part_number: part_number.to_string(),
                available: item.quantity_on_hand,
                requested,
            });
        }
    }
    Ok(())
}

/// Apply a batch of already-validated movements
pub fn apply_movements<L: StockLedger + ?Sized>(
    ledger: &mut L,
    movements: &[(Uuid, i32)],
    reason: &MovementReason,
) -> WorkflowResult<()> {
    for (stock_id, delta) in movements {
        if *delta != 0 {
            ledger.adjust(*stock_id, *delta, reason)?;
        }
    }
    Ok(())
}

/// Ledger held in memory, with a journal of every applied movement
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    home_workshop: String,
    items: HashMap<Uuid, StockItem>,
    journal: Vec<StockMovement>,
}

impl InMemoryLedger {
    pub fn new(home_workshop: impl Into<String>) -> Self {
        Self {
            home_workshop: home_workshop.into(),
            items: HashMap::new(),
            journal: Vec::new(),
        }
    }

    pub fn with_items(
        home_workshop: impl Into<String>,
        items: impl IntoIterator<Item = StockItem>,
    ) -> WorkflowResult<Self> {
        let mut ledger = Self::new(home_workshop);
        for item in items {
            ledger.insert(item)?;
        }
        Ok(ledger)
    }

    /// Register a row; `(workshop, part_number)` must stay unique
    pub fn insert(&mut self, item: StockItem) -> WorkflowResult<()> {
        let clash = self.items.contains_key(&item.id)
            || self
                .items
                .values()
                .any(|i| i.workshop == item.workshop && i.part_number == item.part_number);
        if clash {
            return Err(WorkflowError::DuplicateKey {
                entity: "stock item",
                key: item.workshop_key(),
            });
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    pub fn items(&self) -> impl Iterator<Item = &StockItem> {
        self.items.values()
    }

    pub fn quantity_of(&self, stock_id: Uuid) -> Option<i32> {
        self.items.get(&stock_id).map(|i| i.quantity_on_hand)
    }

    /// Quantity of a part in a workshop, zero when not stocked there
    pub fn quantity_at(&self, workshop: &str, part_number: &str) -> i32 {
        self.lookup_part(workshop, part_number)
            .map(|i| i.quantity_on_hand)
            .unwrap_or(0)
    }

    pub fn journal(&self) -> &[StockMovement] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<StockMovement> {
        std::mem::take(&mut self.journal)
    }
}

impl StockLedger for InMemoryLedger {
    fn home_workshop(&self) -> &str {
        &self.home_workshop
    }

    fn lookup(&self, stock_id: Uuid) -> WorkflowResult<&StockItem> {
        self.items
            .get(&stock_id)
            .ok_or_else(|| WorkflowError::not_found("stock item", stock_id.to_string()))
    }

    fn lookup_part(&self, workshop: &str, part_number: &str) -> WorkflowResult<&StockItem> {
        self.items
            .values()
            .find(|i| i.workshop == workshop && i.part_number == part_number)
            .ok_or_else(|| WorkflowError::not_found("stock item", format!("{}/{}", workshop, part_number)))
    }

    fn adjust(&mut self, stock_id: Uuid, delta: i32, reason: &MovementReason) -> WorkflowResult<&StockItem> {
        let item = self
            .items
            .get_mut(&stock_id)
            .ok_or_else(|| WorkflowError::not_found("stock item", stock_id.to_string()))?;

        let next = item.quantity_on_hand.checked_add(delta).ok_or_else(|| {
            WorkflowError::validation("quantity", format!("adjustment overflows stock of {}", item.part_number))
        })?;
        if next < 0 {
            return Err(WorkflowError::InsufficientStock {
                part_number: item.part_number.clone(),
                available: item.quantity_on_hand,
                requested: delta.saturating_neg(),
            });
        }

        let now = Utc::now();
        item.quantity_on_hand = next;
        item.last_movement_date = now;
        item.updated_at = now;
        self.journal.push(StockMovement {
            stock_id,
            workshop: item.workshop.clone(),
            part_number: item.part_number.clone(),
            delta,
            quantity_after: next,
            reason: reason.clone(),
            moved_at: now,
        });
        Ok(item)
    }
}
