//! Circulation service: checkout, return and ledger queries

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{BorrowingDetails, BorrowingQuery, BorrowingStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
}

impl CirculationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check out a book copy to a borrower
    pub async fn checkout(
        &self,
        book_id: i32,
        borrower_id: i32,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<BorrowingDetails> {
        self.repository
            .borrowings
            .checkout(book_id, borrower_id, due_date)
            .await
    }

    /// Return a borrowed book; the flag reports whether it came back late
    pub async fn return_book(&self, borrowing_id: i32) -> AppResult<(BorrowingDetails, bool)> {
        self.repository.borrowings.return_borrowing(borrowing_id).await
    }

    /// Get one borrowing with snapshots
    pub async fn get_borrowing(&self, id: i32) -> AppResult<BorrowingDetails> {
        self.repository.borrowings.get_details(id).await
    }

    /// List borrowings with optional filters
    pub async fn list_borrowings(
        &self,
        query: &BorrowingQuery,
    ) -> AppResult<(Vec<BorrowingDetails>, i64)> {
        let status = match &query.status {
            Some(s) => Some(
                s.parse::<BorrowingStatus>()
                    .map_err(AppError::Validation)?,
            ),
            None => None,
        };
        self.repository.borrowings.list(status, query).await
    }

    /// Open borrowings held by one borrower
    pub async fn borrower_open_borrowings(
        &self,
        borrower_id: i32,
    ) -> AppResult<Vec<BorrowingDetails>> {
        // Distinguish an unknown borrower from one with nothing out
        self.repository.borrowers.get_by_id(borrower_id).await?;
        self.repository.borrowings.open_for_borrower(borrower_id).await
    }

    /// Open borrowings past their due date
    pub async fn list_overdue(
        &self,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<BorrowingDetails>, i64)> {
        self.repository
            .borrowings
            .list_overdue(page.max(1), per_page.clamp(1, 100))
            .await
    }
}
