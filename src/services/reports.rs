//! Borrowing report service
//!
//! Pure aggregations over the ledger. Status partitioning goes through the
//! same resolver the listing endpoints use.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    api::reports::{BorrowerTally, BookTally, BorrowingReport, LibrarySummary, StatusCounts},
    error::{AppError, AppResult},
    models::borrowing::BorrowingStatus,
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Current library-wide counts
    pub async fn summary(&self) -> AppResult<LibrarySummary> {
        Ok(LibrarySummary {
            books: self.repository.books.count().await?,
            borrowers: self.repository.borrowers.count().await?,
            open_borrowings: self.repository.borrowings.count_open().await?,
            overdue_borrowings: self.repository.borrowings.count_overdue().await?,
        })
    }

    /// Report over borrowings checked out within [from, to]
    pub async fn borrowing_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<BorrowingReport> {
        if to < from {
            return Err(AppError::Validation(
                "to_date must not be before from_date".to_string(),
            ));
        }

        let borrowings = self
            .repository
            .borrowings
            .checked_out_between(from, to)
            .await?;

        let mut counts = StatusCounts {
            active: 0,
            overdue: 0,
            returned: 0,
        };
        let mut by_book: HashMap<i32, BookTally> = HashMap::new();
        let mut by_borrower: HashMap<i32, BorrowerTally> = HashMap::new();

        for b in &borrowings {
            match b.status {
                BorrowingStatus::Active => counts.active += 1,
                BorrowingStatus::Overdue => counts.overdue += 1,
                BorrowingStatus::Returned => counts.returned += 1,
            }

            by_book
                .entry(b.book.id)
                .or_insert_with(|| BookTally {
                    book_id: b.book.id,
                    title: b.book.title.clone(),
                    author: b.book.author.clone(),
                    borrow_count: 0,
                })
                .borrow_count += 1;

            by_borrower
                .entry(b.borrower.id)
                .or_insert_with(|| BorrowerTally {
                    borrower_id: b.borrower.id,
                    name: b.borrower.name.clone(),
                    borrow_count: 0,
                })
                .borrow_count += 1;
        }

        let mut books: Vec<BookTally> = by_book.into_values().collect();
        books.sort_by(|a, b| b.borrow_count.cmp(&a.borrow_count).then(a.book_id.cmp(&b.book_id)));

        let mut borrowers: Vec<BorrowerTally> = by_borrower.into_values().collect();
        borrowers.sort_by(|a, b| {
            b.borrow_count
                .cmp(&a.borrow_count)
                .then(a.borrower_id.cmp(&b.borrower_id))
        });

        Ok(BorrowingReport {
            from_date: from,
            to_date: to,
            total: borrowings.len() as i64,
            counts,
            books,
            borrowers,
        })
    }
}
