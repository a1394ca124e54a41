//! Postgres side of the stock ledger
//!
//! A transition locks the stock rows its document references, copies them
//! into an [`InMemoryLedger`], and after the pure transition has run
//! writes the ledger's journal back with conditional updates. All of it
//! happens inside the caller's transaction.

use shared::{workshop_key, InMemoryLedger, StockItem, StockMovement, StockRef, WorkflowError};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{StockRow, STOCK_COLUMNS};

/// Lock every referenced stock row, in id order, and load them into a
/// ledger. Rows that do not exist are simply absent; resolving them later
/// reports `NotFound`.
pub async fn lock_snapshot(conn: &mut PgConnection, home_workshop: &str, refs: &[StockRef]) -> AppResult<InMemoryLedger> {
    let mut ids: Vec<Uuid> = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    for stock_ref in refs {
        match stock_ref.stock_id {
            Some(id) => ids.push(id),
            None => keys.push(workshop_key(&stock_ref.workshop, &stock_ref.part_number)),
        }
    }
    ids.sort();
    ids.dedup();
    keys.sort();
    keys.dedup();

    if ids.is_empty() && keys.is_empty() {
        return Ok(InMemoryLedger::new(home_workshop));
    }

    let sql = format!(
        r#"
        SELECT {} FROM stock_items
        WHERE id = ANY($1) OR (workshop || '/' || part_number) = ANY($2)
        ORDER BY id
        FOR UPDATE
        "#,
        STOCK_COLUMNS
    );
    let rows = sqlx::query_as::<_, StockRow>(&sql)
        .bind(&ids)
        .bind(&keys)
        .fetch_all(&mut *conn)
        .await?;

    let ledger = InMemoryLedger::with_items(home_workshop, rows.into_iter().map(StockItem::from))?;
    Ok(ledger)
}

/// Write a journal back. Each delta is applied relative to the stored
/// quantity and only if the result stays non-negative.
pub async fn commit_journal(conn: &mut PgConnection, journal: &[StockMovement], note: Option<&str>) -> AppResult<()> {
    for movement in journal {
        let quantity = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE stock_items
            SET quantity_on_hand = quantity_on_hand + $2,
                last_movement_date = $3,
                updated_at = $3
            WHERE id = $1 AND quantity_on_hand + $2 >= 0
            RETURNING quantity_on_hand
            "#,
        )
        .bind(movement.stock_id)
        .bind(movement.delta)
        .bind(movement.moved_at)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(quantity) = quantity else {
            tracing::warn!(
                part_number = %movement.part_number,
                delta = movement.delta,
                "conditional stock update rejected"
            );
            return Err(WorkflowError::InsufficientStock {
                part_number: movement.part_number.clone(),
                available: movement.quantity_after.saturating_sub(movement.delta),
                requested: movement.delta.saturating_neg(),
            }
            .into());
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                stock_id, workshop, part_number, delta, quantity_after,
                document_kind, document_no, action, note, moved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(movement.stock_id)
        .bind(&movement.workshop)
        .bind(&movement.part_number)
        .bind(movement.delta)
        .bind(quantity)
        .bind(movement.reason.kind.as_str())
        .bind(&movement.reason.document_no)
        .bind(movement.reason.action.as_str())
        .bind(note)
        .bind(movement.moved_at)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            part_number = %movement.part_number,
            delta = movement.delta,
            quantity_on_hand = quantity,
            document_no = %movement.reason.document_no,
            "stock moved"
        );
    }
    Ok(())
}

/// Insert a stock row inside the caller's transaction
pub async fn insert_stock_item(conn: &mut PgConnection, item: &StockItem) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_items (
            id, workshop, part_number, part_name, brand, category, quantity_on_hand,
            purchase_price, selling_price, tax_type, tax_percent, rack_no,
            min_stock_level, max_stock_level, location, is_active,
            last_movement_date, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#,
    )
    .bind(item.id)
    .bind(&item.workshop)
    .bind(&item.part_number)
    .bind(&item.part_name)
    .bind(&item.brand)
    .bind(&item.category)
    .bind(item.quantity_on_hand)
    .bind(item.purchase_price)
    .bind(item.selling_price)
    .bind(item.tax_type.as_str())
    .bind(item.tax_percent)
    .bind(&item.rack_no)
    .bind(item.min_stock_level)
    .bind(item.max_stock_level)
    .bind(&item.location)
    .bind(item.is_active)
    .bind(item.last_movement_date)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Workflow(WorkflowError::DuplicateKey { .. }) => WorkflowError::DuplicateKey {
            entity: "stock item",
            key: item.workshop_key(),
        }
        .into(),
        other => other,
    })?;

    Ok(())
}

/// Load a stock row by part number without locking it
pub async fn find_part(conn: &mut PgConnection, workshop: &str, part_number: &str) -> AppResult<Option<StockItem>> {
    let sql = format!(
        "SELECT {} FROM stock_items WHERE workshop = $1 AND part_number = $2",
        STOCK_COLUMNS
    );
    let row = sqlx::query_as::<_, StockRow>(&sql)
        .bind(workshop)
        .bind(part_number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(StockItem::from))
}
