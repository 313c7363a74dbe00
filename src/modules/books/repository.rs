//! SQLite-backed persistence for books.

use serde_json::json;
use shelf_http::error::AppError;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use time::OffsetDateTime;

use super::models::{Book, BookPage, BookPatch, NewBook};
use super::query::{BookQuery, BOOK_COLUMNS};

#[derive(Debug, Error)]
pub enum BookStoreError {
    #[error("book {0} not found")]
    NotFound(i64),

    #[error("a book with ISBN {0} already exists")]
    IsbnConflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type BookStoreResult<T> = Result<T, BookStoreError>;

impl From<BookStoreError> for AppError {
    fn from(err: BookStoreError) -> Self {
        match err {
            BookStoreError::NotFound(_) => AppError::not_found("Book not found"),
            BookStoreError::IsbnConflict(isbn) => AppError::conflict(
                vec![json!({"field": "isbn", "value": isbn})],
                "A book with this ISBN already exists",
            ),
            BookStoreError::Database(e) => {
                AppError::Internal(anyhow::Error::new(e).context("book store query failed"))
            }
        }
    }
}

/// Column a statistics query groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupColumn {
    Author,
    Genre,
}

impl GroupColumn {
    fn column(self) -> &'static str {
        match self {
            GroupColumn::Author => "author",
            GroupColumn::Genre => "genre",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a validated book. The ISBN pre-check only gives an early answer;
    /// the `UNIQUE` column constraint decides concurrent inserts.
    pub async fn create(&self, new_book: NewBook) -> BookStoreResult<Book> {
        let mut conn = self.pool.acquire().await?;

        if let Some(isbn) = new_book.isbn.as_deref() {
            if isbn_taken(&mut *conn, isbn, None).await? {
                return Err(BookStoreError::IsbnConflict(isbn.to_string()));
            }
        }

        let book = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author, genre, description, publication_year, isbn, created_at, \
             title_folded, author_folded, genre_folded, description_folded) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&new_book.title)
        .bind(&new_book.author)
        .bind(&new_book.genre)
        .bind(&new_book.description)
        .bind(new_book.publication_year)
        .bind(&new_book.isbn)
        .bind(OffsetDateTime::now_utc())
        .bind(new_book.title.to_lowercase())
        .bind(new_book.author.to_lowercase())
        .bind(new_book.genre.to_lowercase())
        .bind(new_book.description.as_deref().map(str::to_lowercase))
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| write_error(e, new_book.isbn.as_deref()))?;

        tracing::info!(book_id = book.id, "book created");
        Ok(book)
    }

    pub async fn get(&self, id: i64) -> BookStoreResult<Book> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut *conn, id).await
    }

    /// Count the filtered set and load the requested page of it.
    pub async fn page(&self, query: &BookQuery) -> BookStoreResult<BookPage> {
        let mut conn = self.pool.acquire().await?;

        let total: i64 = query
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?;

        let books = query
            .page_query()
            .build_query_as::<Book>()
            .fetch_all(&mut *conn)
            .await?;

        Ok(query.page.paginate(books, total.max(0) as u64))
    }

    /// Apply `patch` to book `id` and refresh `updated_at`, all in one transaction.
    ///
    /// The transaction takes the write lock up front so concurrent updates
    /// queue on the busy timeout instead of failing a read-to-write upgrade.
    pub async fn update(&self, id: i64, patch: BookPatch) -> BookStoreResult<Book> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let mut book = fetch(&mut *tx, id).await?;

        if let Some(isbn) = patch.new_isbn() {
            if book.isbn.as_deref() != Some(isbn) && isbn_taken(&mut *tx, isbn, Some(id)).await? {
                return Err(BookStoreError::IsbnConflict(isbn.to_string()));
            }
        }

        book.apply(patch);

        let book = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET title = ?, author = ?, genre = ?, description = ?, \
             publication_year = ?, isbn = ?, updated_at = ?, \
             title_folded = ?, author_folded = ?, genre_folded = ?, description_folded = ? \
             WHERE id = ? RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.publication_year)
        .bind(&book.isbn)
        .bind(OffsetDateTime::now_utc())
        .bind(book.title.to_lowercase())
        .bind(book.author.to_lowercase())
        .bind(book.genre.to_lowercase())
        .bind(book.description.as_deref().map(str::to_lowercase))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, book.isbn.as_deref()))?;

        tx.commit().await?;

        tracing::info!(book_id = id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: i64) -> BookStoreResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookStoreError::NotFound(id));
        }

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// Number of books per distinct value of `column`, ordered by value.
    pub async fn count_by(&self, column: GroupColumn) -> BookStoreResult<Vec<(String, i64)>> {
        let column = column.column();
        let counts = sqlx::query_as::<_, (String, i64)>(&format!(
            "SELECT {column}, COUNT(id) FROM books GROUP BY {column} ORDER BY {column}"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> BookStoreResult<Book> {
    sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(BookStoreError::NotFound(id))
}

async fn isbn_taken(
    conn: &mut SqliteConnection,
    isbn: &str,
    except_id: Option<i64>,
) -> BookStoreResult<bool> {
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ? AND id IS NOT ?)",
    )
    .bind(isbn)
    .bind(except_id)
    .fetch_one(conn)
    .await?;
    Ok(taken != 0)
}

/// A unique violation on write can only come from the ISBN column.
fn write_error(err: sqlx::Error, isbn: Option<&str>) -> BookStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            tracing::warn!(isbn = ?isbn, "ISBN collision caught by the store constraint");
            return BookStoreError::IsbnConflict(isbn.unwrap_or_default().to_string());
        }
    }
    BookStoreError::Database(err)
}
