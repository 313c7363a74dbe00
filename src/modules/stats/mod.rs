//! Per-author and per-genre book counts.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shelf_http::error::AppError;
use shelf_kernel::Module;

use super::books::repository::{BookRepository, GroupColumn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub book_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorStats {
    pub authors: Vec<AuthorCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub book_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreStats {
    pub genres: Vec<GenreCount>,
}

pub struct StatsModule {
    repository: BookRepository,
}

impl StatsModule {
    pub fn new(repository: BookRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for StatsModule {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/stats/authors", get(author_stats))
            .route("/stats/authors/", get(author_stats))
            .route("/stats/genres", get(genre_stats))
            .route("/stats/genres/", get(genre_stats))
            .with_state(self.repository.clone())
    }

    fn openapi(&self) -> Option<Value> {
        let counts = |key: &str, item: &str| {
            json!({
                "type": "object",
                "properties": {
                    key: {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                item: { "type": "string" },
                                "book_count": { "type": "integer" }
                            }
                        }
                    }
                },
                "required": [key]
            })
        };
        let operation = |summary: &str, schema: &str| {
            json!({
                "get": {
                    "summary": summary,
                    "tags": ["Stats"],
                    "responses": {
                        "200": {
                            "description": "Counts per distinct value",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": format!("#/components/schemas/{schema}") }
                                }
                            }
                        }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/stats/authors/": operation("Book counts per author", "AuthorStats"),
                "/stats/genres/": operation("Book counts per genre", "GenreStats")
            },
            "components": {
                "schemas": {
                    "AuthorStats": counts("authors", "author"),
                    "GenreStats": counts("genres", "genre")
                }
            }
        }))
    }
}

async fn author_stats(
    State(repository): State<BookRepository>,
) -> Result<Json<AuthorStats>, AppError> {
    let authors = repository
        .count_by(GroupColumn::Author)
        .await?
        .into_iter()
        .map(|(author, book_count)| AuthorCount { author, book_count })
        .collect();
    Ok(Json(AuthorStats { authors }))
}

async fn genre_stats(
    State(repository): State<BookRepository>,
) -> Result<Json<GenreStats>, AppError> {
    let genres = repository
        .count_by(GroupColumn::Genre)
        .await?
        .into_iter()
        .map(|(genre, book_count)| GenreCount { genre, book_count })
        .collect();
    Ok(Json(GenreStats { genres }))
}

pub fn create_module(repository: BookRepository) -> Arc<dyn Module> {
    Arc::new(StatsModule::new(repository))
}
