use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::query::{SortField, SortOrder};

/// Catalog entry as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub isbn: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Book {
    /// Overwrite the fields present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(publication_year) = patch.publication_year {
            self.publication_year = publication_year;
        }
        if let Some(isbn) = patch.isbn {
            self.isbn = isbn;
        }
    }
}

/// Request body for creating a book.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBook {
    #[garde(length(chars, min = 1, max = 200))]
    pub title: String,
    #[garde(length(chars, min = 1, max = 100))]
    pub author: String,
    #[garde(length(chars, min = 1, max = 50))]
    pub genre: String,
    #[serde(default)]
    #[garde(skip)]
    pub description: Option<String>,
    #[serde(default)]
    #[garde(range(min = 1000, max = 2100))]
    pub publication_year: Option<i32>,
    #[serde(default)]
    #[garde(length(chars, max = 20), pattern(r"^[0-9-]+$"))]
    pub isbn: Option<String>,
}

/// Request body for a partial update.
///
/// Outer `None` means the field was absent and stays untouched. For the
/// nullable columns, `Some(None)` is an explicit `null` that clears the value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookPatch {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 100))]
    pub author: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 50))]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[garde(skip)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[garde(range(min = 1000, max = 2100))]
    pub publication_year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    #[garde(length(chars, max = 20), pattern(r"^[0-9-]+$"))]
    pub isbn: Option<Option<String>>,
}

impl BookPatch {
    /// The ISBN this patch assigns, if it assigns a non-null one.
    pub fn new_isbn(&self) -> Option<&str> {
        self.isbn.as_ref().and_then(|isbn| isbn.as_deref())
    }
}

/// Marks a field as present whenever its key appears, even with `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_limit() -> u32 {
    10
}

/// Query parameters of `GET /books/`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListParams {
    #[serde(default)]
    #[garde(skip)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    #[garde(range(min = 1, max = 100))]
    pub limit: u32,
    #[serde(default)]
    #[garde(skip)]
    pub author: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub genre: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub sort_by: SortField,
    #[serde(default)]
    #[garde(skip)]
    pub sort_order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            author: None,
            genre: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Query parameters of `GET /books/search/`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchParams {
    #[garde(length(chars, min = 1))]
    pub q: String,
    #[serde(default)]
    #[garde(skip)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    #[garde(range(min = 1, max = 100))]
    pub limit: u32,
}

/// One page of books plus the pagination summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_book(value: serde_json::Value) -> NewBook {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_new_book_passes() {
        let book = new_book(json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "SciFi",
            "publication_year": 1965,
            "isbn": "978-0-441-01359-3"
        }));
        assert!(book.validate().is_ok());
        assert!(book.description.is_none());
    }

    #[test]
    fn new_book_constraints_are_enforced() {
        let cases = [
            json!({"title": "", "author": "A", "genre": "G"}),
            json!({"title": "x".repeat(201), "author": "A", "genre": "G"}),
            json!({"title": "T", "author": "a".repeat(101), "genre": "G"}),
            json!({"title": "T", "author": "A", "genre": "g".repeat(51)}),
            json!({"title": "T", "author": "A", "genre": "G", "publication_year": 999}),
            json!({"title": "T", "author": "A", "genre": "G", "publication_year": 2101}),
            json!({"title": "T", "author": "A", "genre": "G", "isbn": "ISBN-123"}),
            json!({"title": "T", "author": "A", "genre": "G", "isbn": ""}),
        ];
        for case in cases {
            assert!(new_book(case.clone()).validate().is_err(), "{case}");
        }
    }

    #[test]
    fn lengths_count_characters() {
        let book = new_book(json!({"title": "Ж".repeat(200), "author": "Толстой", "genre": "Роман"}));
        assert!(book.validate().is_ok());
    }

    #[test]
    fn year_bounds_are_inclusive() {
        for year in [1000, 2100] {
            let book = new_book(json!({"title": "T", "author": "A", "genre": "G", "publication_year": year}));
            assert!(book.validate().is_ok());
        }
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: BookPatch = serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.isbn, None);
        assert_eq!(patch.new_isbn(), None);

        let patch: BookPatch = serde_json::from_value(json!({"isbn": "123"})).unwrap();
        assert_eq!(patch.new_isbn(), Some("123"));
    }

    #[test]
    fn null_required_field_in_patch_is_absent() {
        let patch: BookPatch =
            serde_json::from_value(json!({"title": null, "author": null, "genre": null})).unwrap();
        assert_eq!(patch.title, None);
        assert_eq!(patch.author, None);
        assert_eq!(patch.genre, None);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn patch_rules_match_create_rules() {
        let bad: BookPatch = serde_json::from_value(json!({"publication_year": 3000})).unwrap();
        assert!(bad.validate().is_err());

        let bad: BookPatch = serde_json::from_value(json!({"isbn": "abc"})).unwrap();
        assert!(bad.validate().is_err());

        let bad: BookPatch = serde_json::from_value(json!({"title": ""})).unwrap();
        assert!(bad.validate().is_err());

        let cleared: BookPatch =
            serde_json::from_value(json!({"isbn": null, "publication_year": null})).unwrap();
        assert!(cleared.validate().is_ok());
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut book = Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            genre: "SciFi".to_string(),
            description: Some("Spice".to_string()),
            publication_year: Some(1965),
            isbn: Some("123".to_string()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: None,
        };

        let patch: BookPatch =
            serde_json::from_value(json!({"genre": "Classic", "description": null})).unwrap();
        book.apply(patch);

        assert_eq!(book.title, "Dune");
        assert_eq!(book.genre, "Classic");
        assert_eq!(book.description, None);
        assert_eq!(book.publication_year, Some(1965));
        assert_eq!(book.isbn.as_deref(), Some("123"));
    }

    #[test]
    fn list_params_defaults() {
        let params: ListParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.skip, 0);
        assert_eq!(params.limit, 10);
        assert_eq!(params.sort_by, SortField::Id);
        assert_eq!(params.sort_order, SortOrder::Asc);
        assert!(params.validate().is_ok());

        let params: ListParams = serde_json::from_value(json!({"limit": 0})).unwrap();
        assert!(params.validate().is_err());
        let params: ListParams = serde_json::from_value(json!({"limit": 101})).unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn search_requires_non_empty_query() {
        let params: SearchParams = serde_json::from_value(json!({"q": ""})).unwrap();
        assert!(params.validate().is_err());
        assert!(serde_json::from_value::<SearchParams>(json!({})).is_err());
    }
}
