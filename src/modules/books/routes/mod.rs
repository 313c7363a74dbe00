use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use shelf_http::{
    error::AppError,
    extract::{Path, ValidJson, ValidQuery},
};

use super::models::{Book, BookPage, BookPatch, ListParams, NewBook, SearchParams};
use super::query::BookQuery;
use super::repository::BookRepository;

/// Book CRUD and search routes. Collection paths answer with and without the trailing slash.
pub fn router(repository: BookRepository) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/", get(list_books).post(create_book))
        .route("/books/search", get(search_books))
        .route("/books/search/", get(search_books))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(repository)
}

async fn create_book(
    State(repository): State<BookRepository>,
    ValidJson(new_book): ValidJson<NewBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = repository.create(new_book).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(repository): State<BookRepository>,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<BookPage>, AppError> {
    tracing::debug!(?params, "listing books");
    let page = repository.page(&BookQuery::list(params)).await?;
    Ok(Json(page))
}

async fn get_book(
    State(repository): State<BookRepository>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(repository.get(id).await?))
}

async fn update_book(
    State(repository): State<BookRepository>,
    Path(id): Path<i64>,
    ValidJson(patch): ValidJson<BookPatch>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(repository.update(id, patch).await?))
}

async fn delete_book(
    State(repository): State<BookRepository>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    repository.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_books(
    State(repository): State<BookRepository>,
    ValidQuery(params): ValidQuery<SearchParams>,
) -> Result<Json<BookPage>, AppError> {
    tracing::debug!(q = %params.q, "searching books");
    let page = repository.page(&BookQuery::search(params)).await?;
    Ok(Json(page))
}
