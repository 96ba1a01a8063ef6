//! Books repository for catalog operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BookNotFound(id))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            WHERE ($1::text IS NULL OR title ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR author ILIKE '%' || $2 || '%')
              AND ($3::text IS NULL OR isbn = $3)
        "#;

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT * FROM books {} ORDER BY title LIMIT $4 OFFSET $5",
            filter
        ))
        .bind(&query.title)
        .bind(&query.author)
        .bind(&query.isbn)
        .bind(per_page)
        .bind((page - 1).saturating_mul(per_page))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books {}", filter))
                .bind(&query.title)
                .bind(&query.author)
                .bind(&query.isbn)
                .fetch_one(&self.pool)
                .await?;

        Ok((books, total))
    }

    /// Add a book to the catalog. All copies start available.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(&book.isbn)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(AppError::Duplicate(format!(
                "Book with ISBN {} already exists",
                book.isbn
            )));
        }

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, total_quantity, available_quantity, location)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.total_quantity)
        .bind(&book.location)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update book metadata and inventory.
    ///
    /// When `total_quantity` changes, availability is re-derived from the
    /// count of open borrowings; the new total may not drop below that count.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::BookNotFound(id))?;

        let (total, available) = match update.total_quantity {
            Some(new_total) => {
                let open = current.total_quantity - current.available_quantity;
                if new_total < open {
                    return Err(AppError::Validation(format!(
                        "total_quantity {} is less than the {} open borrowings",
                        new_total, open
                    )));
                }
                (new_total, new_total - open)
            }
            None => (current.total_quantity, current.available_quantity),
        };

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($1, title),
                author = COALESCE($2, author),
                location = COALESCE($3, location),
                total_quantity = $4,
                available_quantity = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.location)
        .bind(total)
        .bind(available)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a book.
    ///
    /// Rejected while any open borrowing references it. With `force`, the
    /// book's entire borrowing history is destroyed along with it.
    pub async fn delete(&self, id: i32, force: bool) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the book row so the guard and the cascade see one snapshot;
        // a checkout in flight on this book serializes here
        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::BookNotFound(id))?;

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open > 0 && !force {
            return Err(AppError::HasActiveBorrowings(format!(
                "Book {} has {} active borrowings. Use force=true to delete anyway.",
                id, open
            )));
        }

        sqlx::query("DELETE FROM borrowings WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Count catalog entries
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
