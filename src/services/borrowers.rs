//! Borrowers service

use crate::{
    error::AppResult,
    models::borrower::{Borrower, BorrowerQuery, CreateBorrower, UpdateBorrower},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowersService {
    repository: Repository,
}

impl BorrowersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search borrowers
    pub async fn search_borrowers(&self, query: &BorrowerQuery) -> AppResult<(Vec<Borrower>, i64)> {
        self.repository.borrowers.search(query).await
    }

    /// Get a borrower by ID
    pub async fn get_borrower(&self, id: i32) -> AppResult<Borrower> {
        self.repository.borrowers.get_by_id(id).await
    }

    /// Register a new borrower
    pub async fn create_borrower(&self, borrower: &CreateBorrower) -> AppResult<Borrower> {
        self.repository.borrowers.create(borrower).await
    }

    /// Update borrower details
    pub async fn update_borrower(&self, id: i32, update: &UpdateBorrower) -> AppResult<Borrower> {
        self.repository.borrowers.update(id, update).await
    }

    /// Delete a borrower (guarded against open borrowings unless forced)
    pub async fn delete_borrower(&self, id: i32, force: bool) -> AppResult<()> {
        self.repository.borrowers.delete(id, force).await
    }
}
