//! Low-stock alerts raised against stock rows at or below their minimum

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkflowResult;
use crate::models::StockItem;
use crate::types::{append_note, BulkOutcome, DocumentKind};
use crate::workflow::{Action, StatusMachine, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::LowStock => write!(f, "Low Stock"),
            AlertType::OutOfStock => write!(f, "Out of Stock"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Ignored,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Ignored => "ignored",
        }
    }

    /// Open alerts block a new alert for the same stock row
    pub fn is_open(&self) -> bool {
        matches!(self, AlertStatus::Active | AlertStatus::Acknowledged)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "Active"),
            AlertStatus::Acknowledged => write!(f, "Acknowledged"),
            AlertStatus::Resolved => write!(f, "Resolved"),
            AlertStatus::Ignored => write!(f, "Ignored"),
        }
    }
}

/// Classification of a stock row's level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockAssessment {
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub reorder_qty: i32,
}

/// Assess a row; `None` when it is not low on stock
pub fn assess(item: &StockItem) -> Option<StockAssessment> {
    if !item.is_low_stock() {
        return None;
    }
    let qty = item.quantity_on_hand;
    let min = item.min_stock_level;
    let (alert_type, priority) = if qty == 0 {
        (AlertType::OutOfStock, AlertPriority::Critical)
    } else if qty * 2 <= min {
        (AlertType::LowStock, AlertPriority::High)
    } else {
        (AlertType::LowStock, AlertPriority::Medium)
    };
    let target = item.max_stock_level.unwrap_or(min * 2);
    Some(StockAssessment {
        alert_type,
        priority,
        reorder_qty: (target - qty).max(0),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: Uuid,
    pub alert_no: String,
    pub stock_id: Uuid,
    pub workshop: String,
    pub part_number: String,
    pub part_name: String,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub current_stock: i32,
    pub min_stock_level: i32,
    pub reorder_qty: i32,
    pub status: AlertStatus,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StatusMachine for StockAlert {
    type Status = AlertStatus;
    const KIND: DocumentKind = DocumentKind::StockAlert;
    const TRANSITIONS: &'static [Transition<AlertStatus>] = &[
        Transition {
            action: Action::Acknowledge,
            from: &[AlertStatus::Active],
        },
        Transition {
            action: Action::Resolve,
            from: &[AlertStatus::Active, AlertStatus::Acknowledged],
        },
        Transition {
            action: Action::Ignore,
            from: &[AlertStatus::Active, AlertStatus::Acknowledged],
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.alert_no
    }

    fn status(&self) -> AlertStatus {
        self.status
    }
}

impl StockAlert {
    /// Raise an alert for a low row, or nothing if the row is healthy
    pub fn raise(alert_no: String, item: &StockItem) -> Option<Self> {
        let assessment = assess(item)?;
        let now = Utc::now();
        Some(Self {
            id: Uuid::new_v4(),
            alert_no,
            stock_id: item.id,
            workshop: item.workshop.clone(),
            part_number: item.part_number.clone(),
            part_name: item.part_name.clone(),
            alert_type: assessment.alert_type,
            priority: assessment.priority,
            current_stock: item.quantity_on_hand,
            min_stock_level: item.min_stock_level,
            reorder_qty: assessment.reorder_qty,
            status: AlertStatus::Active,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn acknowledge(&mut self, by: Option<Uuid>) -> WorkflowResult<()> {
        self.ensure_can(Action::Acknowledge)?;
        let now = Utc::now();
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_by = by;
        self.acknowledged_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn resolve(&mut self, note: Option<String>) -> WorkflowResult<()> {
        self.ensure_can(Action::Resolve)?;
        let now = Utc::now();
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(now);
        if let Some(note) = note {
            append_note(&mut self.notes, note);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn ignore(&mut self, note: Option<String>) -> WorkflowResult<()> {
        self.ensure_can(Action::Ignore)?;
        self.status = AlertStatus::Ignored;
        if let Some(note) = note {
            append_note(&mut self.notes, note);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Resolve a batch of alerts; ones already closed are reported as failures
pub fn resolve_alerts(alerts: Vec<StockAlert>, note: Option<&str>) -> BulkOutcome<StockAlert> {
    let mut outcome = BulkOutcome::default();
    for mut alert in alerts {
        match alert.resolve(note.map(str::to_string)) {
            Ok(()) => outcome.succeeded.push(alert),
            Err(err) => outcome.fail(alert.alert_no.clone(), err),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewStockItem, TaxType};
    use rust_decimal::Decimal;

    fn item(qty: i32, min: i32, max: Option<i32>) -> StockItem {
        StockItem::new(
            NewStockItem {
                part_number: "OF-1".to_string(),
                part_name: "Oil Filter".to_string(),
                brand: None,
                category: None,
                workshop: None,
                opening_quantity: qty,
                purchase_price: Decimal::from(100),
                selling_price: Decimal::from(150),
                tax_type: TaxType::Gst,
                tax_percent: Decimal::from(18),
                rack_no: None,
                min_stock_level: min,
                max_stock_level: max,
                location: None,
            },
            "main",
        )
        .unwrap()
    }

    #[test]
    fn test_assessment_priorities() {
        assert!(assess(&item(11, 10, None)).is_none());

        let medium = assess(&item(8, 10, None)).unwrap();
        assert_eq!(medium.priority, AlertPriority::Medium);
        assert_eq!(medium.reorder_qty, 12);

        let high = assess(&item(5, 10, Some(40))).unwrap();
        assert_eq!(high.priority, AlertPriority::High);
        assert_eq!(high.reorder_qty, 35);

        let out = assess(&item(0, 10, None)).unwrap();
        assert_eq!(out.alert_type, AlertType::OutOfStock);
        assert_eq!(out.priority, AlertPriority::Critical);
    }

    #[test]
    fn test_no_alert_without_minimum() {
        assert!(StockAlert::raise("ALT1".to_string(), &item(0, 0, None)).is_none());
    }

    #[test]
    fn test_alert_lifecycle() {
        let mut alert = StockAlert::raise("ALT24050001".to_string(), &item(2, 10, None)).unwrap();
        assert!(alert.status.is_open());
        alert.acknowledge(None).unwrap();
        assert!(alert.acknowledge(None).is_err());
        alert.resolve(Some("reordered".to_string())).unwrap();
        assert!(!alert.status.is_open());
        assert!(alert.ignore(None).is_err());
    }

    #[test]
    fn test_resolve_alerts_skips_closed_alerts() {
        let open = StockAlert::raise("ALT24050001".to_string(), &item(2, 10, None)).unwrap();
        let mut seen = StockAlert::raise("ALT24050002".to_string(), &item(0, 10, None)).unwrap();
        seen.acknowledge(None).unwrap();
        let mut ignored = StockAlert::raise("ALT24050003".to_string(), &item(5, 10, None)).unwrap();
        ignored.ignore(None).unwrap();

        let outcome = resolve_alerts(vec![open, seen, ignored], Some("restocked"));
        assert_eq!(outcome.succeeded.len(), 2);
        assert!(outcome
            .succeeded
            .iter()
            .all(|a| a.status == AlertStatus::Resolved && a.notes.as_deref() == Some("restocked")));
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].key, "ALT24050003");
    }
}
