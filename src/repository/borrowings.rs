//! Borrowings repository: the ledger and the transactional circulation engine
//!
//! Checkout and return each run as one transaction covering both the book's
//! availability counter and the ledger row. The book row is locked with
//! `SELECT ... FOR UPDATE` before availability is checked, so two concurrent
//! checkouts against the last copy cannot both succeed.

use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookSummary,
        borrower::BorrowerSummary,
        borrowing::{Borrowing, BorrowingDetails, BorrowingQuery, BorrowingStatus, LOAN_PERIOD_DAYS},
    },
};

/// Shared SELECT joining a ledger row with its book and borrower snapshots
const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.book_id, b.borrower_id, b.checkout_date, b.due_date, b.return_date,
           bk.title, bk.author, bk.isbn, bk.total_quantity, bk.available_quantity,
           br.name, br.email
    FROM borrowings b
    JOIN books bk ON b.book_id = bk.id
    JOIN borrowers br ON b.borrower_id = br.id
"#;

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

/// Map one joined row to the detail view, resolving status as of `now`
fn details_from_row(row: &PgRow, now: DateTime<Utc>) -> BorrowingDetails {
    let borrowing = Borrowing {
        id: row.get("id"),
        book_id: row.get("book_id"),
        borrower_id: row.get("borrower_id"),
        checkout_date: row.get("checkout_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
    };
    let book = BookSummary {
        id: borrowing.book_id,
        title: row.get("title"),
        author: row.get("author"),
        isbn: row.get("isbn"),
        total_quantity: row.get("total_quantity"),
        available_quantity: row.get("available_quantity"),
    };
    let borrower = BorrowerSummary {
        id: borrowing.borrower_id,
        name: row.get("name"),
        email: row.get("email"),
    };
    BorrowingDetails::resolve(&borrowing, book, borrower, now)
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a raw ledger entry by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BorrowingNotFound(id))
    }

    /// Get a borrowing with its book/borrower snapshots
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        let row = sqlx::query(&format!("{} WHERE b.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BorrowingNotFound(id))?;

        Ok(details_from_row(&row, Utc::now()))
    }

    /// Check out a book copy to a borrower.
    ///
    /// Preconditions are checked in order inside one transaction: borrower
    /// exists, book exists, a copy is available. On success the availability
    /// counter and the new ledger row commit together.
    pub async fn checkout(
        &self,
        book_id: i32,
        borrower_id: i32,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<BorrowingDetails> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Shared lock on the borrower row: blocks a concurrent delete of this
        // borrower until the new ledger row commits, without serializing
        // checkouts against each other
        sqlx::query_scalar::<_, i32>("SELECT id FROM borrowers WHERE id = $1 FOR SHARE")
            .bind(borrower_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::BorrowerNotFound(borrower_id))?;

        // Lock the book row; concurrent checkouts on the same book serialize here
        let available: Option<i32> =
            sqlx::query_scalar("SELECT available_quantity FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;

        let available = available.ok_or(AppError::BookNotFound(book_id))?;
        if available <= 0 {
            return Err(AppError::BookUnavailable(book_id));
        }

        sqlx::query("UPDATE books SET available_quantity = available_quantity - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let due_date = due_date.unwrap_or(now + Duration::days(LOAN_PERIOD_DAYS));

        let borrowing_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO borrowings (book_id, borrower_id, checkout_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(borrower_id)
        .bind(now)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("{} WHERE b.id = $1", DETAILS_SELECT))
            .bind(borrowing_id)
            .fetch_one(&mut *tx)
            .await?;
        let details = details_from_row(&row, now);

        tx.commit().await?;

        Ok(details)
    }

    /// Return a borrowed book.
    ///
    /// Closes the ledger entry and increments the book's availability in the
    /// same transaction. Returns the details plus whether the copy came back
    /// past its due date.
    pub async fn return_borrowing(&self, id: i32) -> AppResult<(BorrowingDetails, bool)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::BorrowingNotFound(id))?;

        if borrowing.return_date.is_some() {
            return Err(AppError::AlreadyReturned(id));
        }

        sqlx::query("UPDATE borrowings SET return_date = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE books SET available_quantity = available_quantity + 1 WHERE id = $1")
            .bind(borrowing.book_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!("{} WHERE b.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let details = details_from_row(&row, now);

        tx.commit().await?;

        let was_overdue = now > borrowing.due_date;
        Ok((details, was_overdue))
    }

    /// List borrowings with optional status/book/borrower filters
    pub async fn list(
        &self,
        status: Option<BorrowingStatus>,
        query: &BorrowingQuery,
    ) -> AppResult<(Vec<BorrowingDetails>, i64)> {
        let now = Utc::now();
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let status_str = status.map(|s| s.as_str().to_string());

        let filter = r#"
            WHERE ($1::int IS NULL OR b.book_id = $1)
              AND ($2::int IS NULL OR b.borrower_id = $2)
              AND ($3::text IS NULL
                   OR ($3 = 'returned' AND b.return_date IS NOT NULL)
                   OR ($3 = 'active' AND b.return_date IS NULL AND b.due_date >= $4)
                   OR ($3 = 'overdue' AND b.return_date IS NULL AND b.due_date < $4))
        "#;

        let rows = sqlx::query(&format!(
            "{} {} ORDER BY b.checkout_date DESC LIMIT $5 OFFSET $6",
            DETAILS_SELECT, filter
        ))
        .bind(query.book_id)
        .bind(query.borrower_id)
        .bind(&status_str)
        .bind(now)
        .bind(per_page)
        .bind((page - 1).saturating_mul(per_page))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM borrowings b {}",
            filter
        ))
        .bind(query.book_id)
        .bind(query.borrower_id)
        .bind(&status_str)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.iter().map(|r| details_from_row(r, now)).collect(), total))
    }

    /// Open borrowings held by one borrower, due soonest first
    pub async fn open_for_borrower(&self, borrower_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        let now = Utc::now();

        let rows = sqlx::query(&format!(
            "{} WHERE b.borrower_id = $1 AND b.return_date IS NULL ORDER BY b.due_date",
            DETAILS_SELECT
        ))
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| details_from_row(r, now)).collect())
    }

    /// Open borrowings past their due date, most overdue first
    pub async fn list_overdue(
        &self,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<BorrowingDetails>, i64)> {
        let now = Utc::now();

        let rows = sqlx::query(&format!(
            "{} WHERE b.return_date IS NULL AND b.due_date < $1 ORDER BY b.due_date LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        ))
        .bind(now)
        .bind(per_page)
        .bind((page - 1).saturating_mul(per_page))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE return_date IS NULL AND due_date < $1",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.iter().map(|r| details_from_row(r, now)).collect(), total))
    }

    /// Borrowings whose checkout date falls within [from, to], for reporting
    pub async fn checked_out_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let now = Utc::now();

        let rows = sqlx::query(&format!(
            "{} WHERE b.checkout_date >= $1 AND b.checkout_date <= $2 ORDER BY b.checkout_date",
            DETAILS_SELECT
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| details_from_row(r, now)).collect())
    }

    /// Count currently open borrowings
    pub async fn count_open(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrowings WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count open borrowings past their due date
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE return_date IS NULL AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
