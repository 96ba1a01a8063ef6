//! Borrowing report endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::AuthenticatedUser;

/// Borrowing counts partitioned by resolved status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCounts {
    pub active: i64,
    pub overdue: i64,
    pub returned: i64,
}

/// Borrow count for one book
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookTally {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub borrow_count: i64,
}

/// Borrow count for one borrower
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowerTally {
    pub borrower_id: i32,
    pub name: String,
    pub borrow_count: i64,
}

/// Report over borrowings checked out within a date range
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowingReport {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub total: i64,
    pub counts: StatusCounts,
    /// Per-book borrow tallies, most borrowed first
    pub books: Vec<BookTally>,
    /// Per-borrower borrow tallies, most active first
    pub borrowers: Vec<BorrowerTally>,
}

/// Current library-wide counts
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibrarySummary {
    pub books: i64,
    pub borrowers: i64,
    pub open_borrowings: i64,
    pub overdue_borrowings: i64,
}

/// Report query parameters
#[derive(Deserialize)]
pub struct ReportQuery {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Borrowing report for a checkout-date range
#[utoipa::path(
    get,
    path = "/reports/borrowings",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(
        ("from_date" = String, Query, description = "Range start (ISO 8601)"),
        ("to_date" = String, Query, description = "Range end (ISO 8601)")
    ),
    responses(
        (status = 200, description = "Borrowing report", body = BorrowingReport),
        (status = 400, description = "Missing or invalid date range")
    )
)]
pub async fn borrowing_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<BorrowingReport>> {
    claims.require_reports()?;

    let from = query
        .from_date
        .ok_or_else(|| AppError::Validation("from_date is required".to_string()))?;
    let to = query
        .to_date
        .ok_or_else(|| AppError::Validation("to_date is required".to_string()))?;

    let report = state.services.reports.borrowing_report(from, to).await?;
    Ok(Json(report))
}

/// Library-wide summary counts
#[utoipa::path(
    get,
    path = "/reports/summary",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Summary counts", body = LibrarySummary)
    )
)]
pub async fn summary(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LibrarySummary>> {
    claims.require_reports()?;

    let summary = state.services.reports.summary().await?;
    Ok(Json(summary))
}
