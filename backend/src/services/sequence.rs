//! Document number allocation
//!
//! One counter row per prefix. Allocation is a single upsert, so two
//! concurrent creations can never draw the same number.

use chrono::NaiveDate;
use shared::{document_prefix, format_document_number, DocumentKind};
use sqlx::PgExecutor;

use crate::error::AppResult;

/// Next number for `kind` on `date`, e.g. `PO24050001`
pub async fn next_document_no<'e>(db: impl PgExecutor<'e>, kind: DocumentKind, date: NaiveDate) -> AppResult<String> {
    let prefix = document_prefix(kind, date);
    let value = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO document_sequences (prefix, last_value)
        VALUES ($1, 1)
        ON CONFLICT (prefix) DO UPDATE SET last_value = document_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(&prefix)
    .fetch_one(db)
    .await?;

    Ok(format_document_number(&prefix, value.max(0) as u32))
}
