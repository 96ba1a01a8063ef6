//! Circulation (checkout/return) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{BorrowingDetails, BorrowingQuery},
};

use super::{books::PaginatedResponse, AuthenticatedUser};

/// Checkout request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    /// Book ID
    #[validate(range(min = 1, message = "book_id must be positive"))]
    pub book_id: i32,
    /// Borrower ID
    #[validate(range(min = 1, message = "borrower_id must be positive"))]
    pub borrower_id: i32,
    /// Explicit due date (ISO 8601); defaults to checkout + 14 days
    pub due_date: Option<DateTime<Utc>>,
}

/// Return response with the closed borrowing
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Whether the copy came back past its due date
    pub was_overdue: bool,
    /// Borrowing details
    pub borrowing: BorrowingDetails,
}

/// Overdue list query parameters
#[derive(Deserialize)]
pub struct OverdueQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Check out a book to a borrower
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Book checked out", body = BorrowingDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Book or borrower not found"),
        (status = 409, description = "No available copies")
    )
)]
pub async fn checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<BorrowingDetails>)> {
    claims.require_circulation()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // The engine accepts any due date; the API rejects ones already in the past
    if let Some(due) = request.due_date {
        if due <= Utc::now() {
            return Err(AppError::Validation(
                "due_date must be in the future".to_string(),
            ));
        }
    }

    let borrowing = state
        .services
        .circulation
        .checkout(request.book_id, request.borrower_id, request.due_date)
        .await?;

    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_circulation()?;

    let (borrowing, was_overdue) = state.services.circulation.return_book(id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        was_overdue,
        borrowing,
    }))
}

/// Get borrowing details by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing details", body = BorrowingDetails),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_read_borrowings()?;

    let borrowing = state.services.circulation.get_borrowing(id).await?;
    Ok(Json(borrowing))
}

/// List borrowings with filters
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by status (active, overdue, returned)"),
        ("book_id" = Option<i32>, Query, description = "Filter by book"),
        ("borrower_id" = Option<i32>, Query, description = "Filter by borrower"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of borrowings", body = PaginatedResponse<BorrowingDetails>),
        (status = 400, description = "Invalid status filter")
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowingDetails>>> {
    claims.require_read_borrowings()?;

    let (borrowings, total) = state.services.circulation.list_borrowings(&query).await?;

    Ok(Json(PaginatedResponse {
        items: borrowings,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// List overdue borrowings
#[utoipa::path(
    get,
    path = "/borrowings/overdue",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Overdue borrowings", body = PaginatedResponse<BorrowingDetails>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<OverdueQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowingDetails>>> {
    claims.require_read_borrowings()?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);

    let (borrowings, total) = state.services.circulation.list_overdue(page, limit).await?;

    Ok(Json(PaginatedResponse {
        items: borrowings,
        total,
        page,
        per_page: limit,
    }))
}

/// Get a borrower's open borrowings
#[utoipa::path(
    get,
    path = "/borrowers/{id}/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower's open borrowings", body = Vec<BorrowingDetails>),
        (status = 404, description = "Borrower not found")
    )
)]
pub async fn get_borrower_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(borrower_id): Path<i32>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    claims.require_read_borrowings()?;

    let borrowings = state
        .services
        .circulation
        .borrower_open_borrowings(borrower_id)
        .await?;
    Ok(Json(borrowings))
}
