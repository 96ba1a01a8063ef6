//! Borrowers repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::borrower::{Borrower, BorrowerQuery, CreateBorrower, UpdateBorrower},
};

#[derive(Clone)]
pub struct BorrowersRepository {
    pool: Pool<Postgres>,
}

impl BorrowersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrower by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BorrowerNotFound(id))
    }

    /// Search borrowers with pagination
    pub async fn search(&self, query: &BorrowerQuery) -> AppResult<(Vec<Borrower>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR email = $2)
        "#;

        let borrowers = sqlx::query_as::<_, Borrower>(&format!(
            "SELECT * FROM borrowers {} ORDER BY name LIMIT $3 OFFSET $4",
            filter
        ))
        .bind(&query.name)
        .bind(&query.email)
        .bind(per_page)
        .bind((page - 1).saturating_mul(per_page))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM borrowers {}", filter))
                .bind(&query.name)
                .bind(&query.email)
                .fetch_one(&self.pool)
                .await?;

        Ok((borrowers, total))
    }

    /// Register a new borrower
    pub async fn create(&self, borrower: &CreateBorrower) -> AppResult<Borrower> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowers WHERE email = $1)")
                .bind(&borrower.email)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(AppError::Duplicate(format!(
                "Borrower with email {} already exists",
                borrower.email
            )));
        }

        let created = sqlx::query_as::<_, Borrower>(
            "INSERT INTO borrowers (name, email) VALUES ($1, $2) RETURNING *",
        )
        .bind(&borrower.name)
        .bind(&borrower.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update borrower details
    pub async fn update(&self, id: i32, update: &UpdateBorrower) -> AppResult<Borrower> {
        self.get_by_id(id).await?;

        if let Some(ref email) = update.email {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM borrowers WHERE email = $1 AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            if taken {
                return Err(AppError::Duplicate(format!(
                    "Borrower with email {} already exists",
                    email
                )));
            }
        }

        let updated = sqlx::query_as::<_, Borrower>(
            r#"
            UPDATE borrowers
            SET name = COALESCE($1, name),
                email = COALESCE($2, email)
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&update.name)
        .bind(&update.email)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete a borrower.
    ///
    /// Rejected while they hold any open borrowing. With `force`, their
    /// borrowing history is destroyed along with the account.
    pub async fn delete(&self, id: i32, force: bool) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the borrower row so the guard and the cascade see one snapshot;
        // checkout holds a shared lock on this row until it commits
        sqlx::query_scalar::<_, i32>("SELECT id FROM borrowers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::BorrowerNotFound(id))?;

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE borrower_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open > 0 && !force {
            return Err(AppError::HasActiveBorrowings(format!(
                "Borrower {} has {} active borrowings. Use force=true to delete anyway.",
                id, open
            )));
        }

        // Open borrowings put copies back in circulation before the cascade
        sqlx::query(
            r#"
            UPDATE books SET available_quantity = available_quantity + open.n
            FROM (
                SELECT book_id, COUNT(*) AS n FROM borrowings
                WHERE borrower_id = $1 AND return_date IS NULL
                GROUP BY book_id
            ) AS open
            WHERE books.id = open.book_id
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM borrowings WHERE borrower_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM borrowers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Count registered borrowers
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrowers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
