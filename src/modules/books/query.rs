//! Filter, sort and pagination translation for book listings.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use super::models::{Book, BookPage, ListParams, SearchParams};

pub const BOOK_COLUMNS: &str =
    "id, title, author, genre, description, publication_year, isbn, created_at, updated_at";

/// Columns a listing may be ordered by. Unknown names fall back to `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum SortField {
    #[default]
    Id,
    Title,
    Author,
    Genre,
    Description,
    PublicationYear,
    Isbn,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Genre => "genre",
            SortField::Description => "description",
            SortField::PublicationYear => "publication_year",
            SortField::Isbn => "isbn",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

impl From<&str> for SortField {
    fn from(name: &str) -> Self {
        match name {
            "title" => SortField::Title,
            "author" => SortField::Author,
            "genre" => SortField::Genre,
            "description" => SortField::Description,
            "publication_year" => SortField::PublicationYear,
            "isbn" => SortField::Isbn,
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            _ => SortField::Id,
        }
    }
}

impl From<String> for SortField {
    fn from(name: String) -> Self {
        SortField::from(name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Offset/limit window over a filtered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn total_pages(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(u64::from(self.limit))
    }

    /// 1-based page the window starts on.
    pub fn current_page(&self) -> u64 {
        if self.limit == 0 {
            return 1;
        }
        u64::from(self.skip) / u64::from(self.limit) + 1
    }

    pub fn paginate(&self, books: Vec<Book>, total: u64) -> BookPage {
        BookPage {
            books,
            total,
            page: self.current_page(),
            page_size: u64::from(self.limit),
            total_pages: self.total_pages(total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookFilter {
    /// Case-insensitive substring match on each given column, combined with AND.
    Fields {
        author: Option<String>,
        genre: Option<String>,
    },
    /// Case-insensitive substring match on title, author or description.
    Search(String),
}

/// A complete listing request: filter, ordering and page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub filter: BookFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

impl BookQuery {
    pub fn list(params: ListParams) -> Self {
        Self {
            filter: BookFilter::Fields {
                author: params.author.filter(|author| !author.is_empty()),
                genre: params.genre.filter(|genre| !genre.is_empty()),
            },
            sort_by: params.sort_by,
            sort_order: params.sort_order,
            page: PageRequest {
                skip: params.skip,
                limit: params.limit,
            },
        }
    }

    pub fn search(params: SearchParams) -> Self {
        Self {
            filter: BookFilter::Search(params.q),
            sort_by: SortField::Id,
            sort_order: SortOrder::Asc,
            page: PageRequest {
                skip: params.skip,
                limit: params.limit,
            },
        }
    }

    /// `SELECT COUNT(*)` over the filtered set, ignoring the page window.
    pub fn count_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books");
        self.push_filter(&mut builder);
        builder
    }

    /// Ordered, windowed select of the filtered set.
    pub fn page_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books"));
        self.push_filter(&mut builder);

        builder
            .push(" ORDER BY ")
            .push(self.sort_by.column())
            .push(" ")
            .push(self.sort_order.keyword());
        if self.sort_by != SortField::Id {
            // Ties keep a stable order across pages.
            builder.push(", id ASC");
        }

        builder
            .push(" LIMIT ")
            .push_bind(i64::from(self.page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(self.page.skip));
        builder
    }

    fn push_filter(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        match &self.filter {
            BookFilter::Fields { author, genre } => {
                let conditions = [("author_folded", author), ("genre_folded", genre)]
                    .into_iter()
                    .filter_map(|(column, value)| value.as_deref().map(|value| (column, value)));

                for (index, (column, value)) in conditions.enumerate() {
                    builder.push(if index == 0 { " WHERE " } else { " AND " });
                    push_contains(builder, column, value);
                }
            }
            BookFilter::Search(text) => {
                builder.push(" WHERE (");
                let columns = ["title_folded", "author_folded", "description_folded"];
                for (index, column) in columns.into_iter().enumerate() {
                    if index > 0 {
                        builder.push(" OR ");
                    }
                    push_contains(builder, column, text);
                }
                builder.push(")");
            }
        }
    }
}

/// `column LIKE '%value%'` against a lowercased shadow column, with the
/// value lowercased, bound and its wildcards escaped.
/// SQLite's `LIKE` folds ASCII only, so both sides are Unicode-lowercased.
fn push_contains(builder: &mut QueryBuilder<'static, Sqlite>, column: &'static str, value: &str) {
    builder
        .push(column)
        .push(" LIKE ")
        .push_bind(like_pattern(&value.to_lowercase()))
        .push(" ESCAPE '\\'");
}

/// Wrap `value` in `%` after escaping `\`, `%` and `_` so it matches literally.
pub fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_field_falls_back_to_id() {
        assert_eq!(SortField::from("publication_year"), SortField::PublicationYear);
        assert_eq!(SortField::from("password"), SortField::Id);
        assert_eq!(SortField::from("id; DROP TABLE books"), SortField::Id);

        let parsed: SortField = serde_json::from_value(serde_json::json!("rating")).unwrap();
        assert_eq!(parsed, SortField::Id);
    }

    #[test]
    fn page_math() {
        let page = PageRequest { skip: 0, limit: 1 };
        assert_eq!(page.total_pages(2), 2);
        assert_eq!(page.current_page(), 1);

        let page = PageRequest { skip: 25, limit: 10 };
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(30), 3);
        assert_eq!(page.total_pages(31), 4);
        assert_eq!(page.current_page(), 3);

        let page = PageRequest { skip: 5, limit: 0 };
        assert_eq!(page.total_pages(10), 0);
        assert_eq!(page.current_page(), 1);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Dune"), "%Dune%");
        assert_eq!(like_pattern("100%_off\\"), "%100\\%\\_off\\\\%");
    }

    #[test]
    fn list_query_without_filters() {
        let query = BookQuery::list(ListParams::default());
        assert_eq!(
            query.count_query().sql(),
            "SELECT COUNT(*) FROM books"
        );
        assert_eq!(
            query.page_query().sql(),
            format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id ASC LIMIT ? OFFSET ?")
        );
    }

    #[test]
    fn list_query_with_filters_and_sort() {
        let query = BookQuery::list(ListParams {
            author: Some("herb".to_string()),
            genre: Some("sci".to_string()),
            sort_by: SortField::Title,
            sort_order: SortOrder::Desc,
            ..ListParams::default()
        });

        assert_eq!(
            query.count_query().sql(),
            "SELECT COUNT(*) FROM books WHERE author_folded LIKE ? ESCAPE '\\' AND genre_folded LIKE ? ESCAPE '\\'"
        );
        assert!(query
            .page_query()
            .sql()
            .ends_with("ORDER BY title DESC, id ASC LIMIT ? OFFSET ?"));
    }

    #[test]
    fn empty_filters_are_ignored() {
        let query = BookQuery::list(ListParams {
            author: Some(String::new()),
            genre: Some("drama".to_string()),
            ..ListParams::default()
        });
        assert_eq!(
            query.count_query().sql(),
            "SELECT COUNT(*) FROM books WHERE genre_folded LIKE ? ESCAPE '\\'"
        );
    }

    #[test]
    fn search_query_ors_three_columns() {
        let query = BookQuery::search(SearchParams {
            q: "dune".to_string(),
            skip: 0,
            limit: 10,
        });
        assert_eq!(
            query.count_query().sql(),
            "SELECT COUNT(*) FROM books WHERE (title_folded LIKE ? ESCAPE '\\' OR author_folded LIKE ? ESCAPE '\\' OR description_folded LIKE ? ESCAPE '\\')"
        );
    }
}
