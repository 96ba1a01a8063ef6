//! Borrower management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::borrower::{Borrower, BorrowerQuery, CreateBorrower, UpdateBorrower},
};

use super::{books::{DeleteQuery, PaginatedResponse}, AuthenticatedUser};

/// List borrowers with search and pagination
#[utoipa::path(
    get,
    path = "/borrowers",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("name" = Option<String>, Query, description = "Search by name"),
        ("email" = Option<String>, Query, description = "Exact email"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of borrowers", body = PaginatedResponse<Borrower>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrowers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowerQuery>,
) -> AppResult<Json<PaginatedResponse<Borrower>>> {
    claims.require_read_borrowers()?;

    let (borrowers, total) = state.services.borrowers.search_borrowers(&query).await?;

    Ok(Json(PaginatedResponse {
        items: borrowers,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get borrower details by ID
#[utoipa::path(
    get,
    path = "/borrowers/{id}",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower details", body = Borrower),
        (status = 404, description = "Borrower not found")
    )
)]
pub async fn get_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrower>> {
    claims.require_read_borrowers()?;

    let borrower = state.services.borrowers.get_borrower(id).await?;
    Ok(Json(borrower))
}

/// Register a new borrower
#[utoipa::path(
    post,
    path = "/borrowers",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    request_body = CreateBorrower,
    responses(
        (status = 201, description = "Borrower registered", body = Borrower),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrower>,
) -> AppResult<(StatusCode, Json<Borrower>)> {
    claims.require_write_borrowers()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let borrower = state.services.borrowers.create_borrower(&request).await?;
    Ok((StatusCode::CREATED, Json(borrower)))
}

/// Update borrower details
#[utoipa::path(
    put,
    path = "/borrowers/{id}",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    request_body = UpdateBorrower,
    responses(
        (status = 200, description = "Borrower updated", body = Borrower),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Borrower not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBorrower>,
) -> AppResult<Json<Borrower>> {
    claims.require_write_borrowers()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let borrower = state.services.borrowers.update_borrower(id, &request).await?;
    Ok(Json(borrower))
}

/// Delete a borrower
#[utoipa::path(
    delete,
    path = "/borrowers/{id}",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID"),
        ("force" = Option<bool>, Query, description = "Cascade delete, destroying borrowing history")
    ),
    responses(
        (status = 204, description = "Borrower deleted"),
        (status = 404, description = "Borrower not found"),
        (status = 409, description = "Borrower has active borrowings")
    )
)]
pub async fn delete_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<StatusCode> {
    claims.require_write_borrowers()?;

    let force = query.force.unwrap_or(false);
    if force {
        claims.require_admin()?;
    }

    state.services.borrowers.delete_borrower(id, force).await?;
    Ok(StatusCode::NO_CONTENT)
}
