pub mod models;
pub mod query;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use shelf_kernel::{InitCtx, Migration, Module};

use repository::BookRepository;

/// Library catalog: book CRUD, filtered listing and search
pub struct BooksModule {
    repository: BookRepository,
}

impl BooksModule {
    pub fn new(repository: BookRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                    title              VARCHAR(200) NOT NULL,
                    author             VARCHAR(100) NOT NULL,
                    genre              VARCHAR(50)  NOT NULL,
                    description        TEXT,
                    publication_year   INTEGER,
                    isbn               VARCHAR(20) UNIQUE,
                    created_at         TEXT NOT NULL,
                    updated_at         TEXT,
                    -- Unicode-lowercased copies for case-insensitive matching
                    title_folded       TEXT NOT NULL,
                    author_folded      TEXT NOT NULL,
                    genre_folded       TEXT NOT NULL,
                    description_folded TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_books_author ON books (author);
                CREATE INDEX IF NOT EXISTS idx_books_genre ON books (genre);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn query_param(name: &str, schema: Value, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "schema": schema,
        "description": description
    })
}

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn book_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn openapi() -> Value {
    let skip = query_param("skip", json!({"type": "integer", "minimum": 0, "default": 0}), "Number of records to skip");
    let limit = query_param(
        "limit",
        json!({"type": "integer", "minimum": 1, "maximum": 100, "default": 10}),
        "Page size",
    );

    json!({
        "paths": {
            "/books/": {
                "get": {
                    "summary": "List books with filtering, sorting and pagination",
                    "tags": ["Books"],
                    "parameters": [
                        skip,
                        limit,
                        query_param("author", json!({"type": "string"}), "Case-insensitive author substring"),
                        query_param("genre", json!({"type": "string"}), "Case-insensitive genre substring"),
                        query_param("sort_by", json!({"type": "string", "default": "id"}), "Field to sort by; unknown fields sort by id"),
                        query_param("sort_order", json!({"type": "string", "enum": ["asc", "desc"], "default": "asc"}), "Sort direction")
                    ],
                    "responses": {
                        "200": json_response("Page of books", "BookPage"),
                        "422": error_response("Invalid query parameters")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body("NewBook"),
                    "responses": {
                        "201": json_response("Created book", "Book"),
                        "400": error_response("ISBN already exists"),
                        "422": error_response("Validation error")
                    }
                }
            },
            "/books/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "responses": {
                        "200": json_response("Book", "Book"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Partially update a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "requestBody": book_body("BookPatch"),
                    "responses": {
                        "200": json_response("Updated book", "Book"),
                        "400": error_response("ISBN already exists"),
                        "404": error_response("Book not found"),
                        "422": error_response("Validation error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "responses": {
                        "204": { "description": "Book deleted" },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/books/search/": {
                "get": {
                    "summary": "Search books by title, author or description",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "q",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string", "minLength": 1 }
                        },
                        skip,
                        limit
                    ],
                    "responses": {
                        "200": json_response("Page of matching books", "BookPage"),
                        "422": error_response("Invalid query parameters")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "genre": { "type": "string" },
                        "description": { "type": ["string", "null"] },
                        "publication_year": { "type": ["integer", "null"] },
                        "isbn": { "type": ["string", "null"] },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": ["string", "null"], "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "genre", "created_at"]
                },
                "NewBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1, "maxLength": 200 },
                        "author": { "type": "string", "minLength": 1, "maxLength": 100 },
                        "genre": { "type": "string", "minLength": 1, "maxLength": 50 },
                        "description": { "type": ["string", "null"] },
                        "publication_year": { "type": ["integer", "null"], "minimum": 1000, "maximum": 2100 },
                        "isbn": { "type": ["string", "null"], "pattern": "^[0-9-]+$", "maxLength": 20 }
                    },
                    "required": ["title", "author", "genre"]
                },
                "BookPatch": {
                    "type": "object",
                    "description": "Absent fields are left unchanged; null clears nullable fields",
                    "properties": {
                        "title": { "type": "string", "minLength": 1, "maxLength": 200 },
                        "author": { "type": "string", "minLength": 1, "maxLength": 100 },
                        "genre": { "type": "string", "minLength": 1, "maxLength": 50 },
                        "description": { "type": ["string", "null"] },
                        "publication_year": { "type": ["integer", "null"], "minimum": 1000, "maximum": 2100 },
                        "isbn": { "type": ["string", "null"], "pattern": "^[0-9-]+$", "maxLength": 20 }
                    }
                },
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                        "total": { "type": "integer" },
                        "page": { "type": "integer" },
                        "page_size": { "type": "integer" },
                        "total_pages": { "type": "integer" }
                    },
                    "required": ["books", "total", "page", "page_size", "total_pages"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(repository: BookRepository) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(repository))
}
