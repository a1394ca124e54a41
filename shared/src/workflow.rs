//! Generic quantity-flow document machinery
//!
//! Every stock-moving document is a small state machine: a status enum, a
//! table of which actions are allowed from which statuses, and a direction
//! in which its primary stock mutation moves the ledger. The concrete
//! documents in [`crate::models`] declare their tables and reuse the guard
//! logic here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::StockRef;
use crate::types::DocumentKind;

/// Operations a document can be asked to perform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Update,
    Submit,
    Approve,
    Verify,
    Inward,
    Reject,
    Issue,
    Return,
    Complete,
    Pay,
    Dispatch,
    Ship,
    UpdateShipment,
    Deliver,
    Receive,
    Refund,
    WaiveRefund,
    Acknowledge,
    Resolve,
    Ignore,
    Cancel,
    Close,
    Delete,
    Adjust,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Verify => "verify",
            Action::Inward => "inward",
            Action::Reject => "reject",
            Action::Issue => "issue",
            Action::Return => "return",
            Action::Complete => "complete",
            Action::Pay => "pay",
            Action::Dispatch => "dispatch",
            Action::Ship => "ship",
            Action::UpdateShipment => "update shipment on",
            Action::Deliver => "deliver",
            Action::Receive => "receive",
            Action::Refund => "refund",
            Action::WaiveRefund => "waive refund on",
            Action::Acknowledge => "acknowledge",
            Action::Resolve => "resolve",
            Action::Ignore => "ignore",
            Action::Cancel => "cancel",
            Action::Close => "close",
            Action::Delete => "delete",
            Action::Adjust => "adjust",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction a document's primary stock mutation moves the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Receipts add stock (purchase orders, inwards)
    Inbound,
    /// Issues, sales, returns to vendor and transfers out remove stock
    Outbound,
}

impl StockDirection {
    pub fn sign(self) -> i32 {
        match self {
            StockDirection::Inbound => 1,
            StockDirection::Outbound => -1,
        }
    }

    /// The direction used when a document is reversed (cancel, refund)
    pub fn reversed(self) -> Self {
        match self {
            StockDirection::Inbound => StockDirection::Outbound,
            StockDirection::Outbound => StockDirection::Inbound,
        }
    }

    /// Signed ledger delta for moving `quantity` units this way
    pub fn delta(self, quantity: i32) -> i32 {
        self.sign() * quantity
    }
}

/// One row of a transition table: `action` is allowed from any of `from`
#[derive(Debug)]
pub struct Transition<S: 'static> {
    pub action: Action,
    pub from: &'static [S],
}

/// A document with a status and a declared transition table
pub trait StatusMachine {
    type Status: Copy + Eq + std::fmt::Display + 'static;

    const KIND: DocumentKind;
    const TRANSITIONS: &'static [Transition<Self::Status>];

    fn id(&self) -> Uuid;
    fn document_no(&self) -> &str;
    fn status(&self) -> Self::Status;

    fn can(&self, action: Action) -> bool {
        let status = self.status();
        Self::TRANSITIONS
            .iter()
            .any(|t| t.action == action && t.from.contains(&status))
    }

    /// Guard an action against the transition table
    fn ensure_can(&self, action: Action) -> WorkflowResult<()> {
        if self.can(action) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                kind: Self::KIND,
                document_no: self.document_no().to_string(),
                from: self.status().to_string(),
                action,
            })
        }
    }

    /// Actions the current status permits, in table order
    fn allowed_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        for t in Self::TRANSITIONS {
            if t.from.contains(&self.status()) && !actions.contains(&t.action) {
                actions.push(t.action);
            }
        }
        actions
    }
}

/// A status machine whose transitions move stock
pub trait QuantityFlow: StatusMachine {
    const DIRECTION: StockDirection;

    /// Every stock row the document may touch, for locking a snapshot.
    /// `home_workshop` fills in rows the document does not scope itself.
    fn stock_refs(&self, home_workshop: &str) -> Vec<StockRef>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        On,
        Broken,
    }

    impl std::fmt::Display for Light {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    struct Switch(Light);

    impl StatusMachine for Switch {
        type Status = Light;
        const KIND: DocumentKind = DocumentKind::StockAdjustment;
        const TRANSITIONS: &'static [Transition<Light>] = &[
            Transition {
                action: Action::Submit,
                from: &[Light::Off],
            },
            Transition {
                action: Action::Cancel,
                from: &[Light::Off, Light::On],
            },
        ];

        fn id(&self) -> Uuid {
            Uuid::nil()
        }

        fn document_no(&self) -> &str {
            "SW-1"
        }

        fn status(&self) -> Light {
            self.0
        }
    }

    #[test]
    fn test_table_guards_actions() {
        assert!(Switch(Light::Off).can(Action::Submit));
        assert!(!Switch(Light::On).can(Action::Submit));
        assert!(Switch(Light::On).ensure_can(Action::Cancel).is_ok());

        let err = Switch(Light::Broken).ensure_can(Action::Cancel).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                kind: DocumentKind::StockAdjustment,
                document_no: "SW-1".to_string(),
                from: "Broken".to_string(),
                action: Action::Cancel,
            }
        );
    }

    #[test]
    fn test_allowed_actions() {
        assert_eq!(
            Switch(Light::Off).allowed_actions(),
            vec![Action::Submit, Action::Cancel]
        );
        assert!(Switch(Light::Broken).allowed_actions().is_empty());
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(StockDirection::Inbound.delta(3), 3);
        assert_eq!(StockDirection::Outbound.delta(3), -3);
        assert_eq!(StockDirection::Outbound.reversed(), StockDirection::Inbound);
    }
}
