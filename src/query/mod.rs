//! Generic list queries.
//!
//! Turns REST query parameters such as
//! `?category[in]=Arte,Música&date[gte]=2025-01-01&sort=-date&select=title,date&page=2`
//! into a parameterized SQL query against any [`Listable`] resource, and
//! shapes the result into the paginated response envelope.
//!
//! Only whitelisted fields can be filtered, sorted or selected; everything
//! else is rejected with `400` instead of silently matching nothing.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

use crate::error::{AppError, AppResult};

mod page;
mod params;
mod sql;

pub use page::{project, PageRef, Paginated, Pagination};
pub use params::{parse_timestamp, Direction, Filter, FilterOp, FilterValue, ListQuery, SortKey};
pub use sql::{count_query, fetch_page, select_query};

/// Raw query-string pairs in request order, parsed per resource with [`ListParams::parse`].
#[derive(Debug, Default)]
pub struct ListParams(pub Vec<(String, String)>);

impl ListParams {
    pub fn parse<R: Listable>(&self) -> AppResult<ListQuery> {
        ListQuery::parse::<R>(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ListParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        Ok(ListParams(pairs))
    }
}

/// How a field is stored, which decides the operators and value parsing it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text stored lowercased; filter values are lowercased before comparing.
    LowercaseText,
    Uuid,
    Timestamp,
    /// Postgres enum; values are checked against `variants` and cast to `type_name`.
    Enum {
        type_name: &'static str,
        variants: &'static [&'static str],
    },
    /// `UUID[]` column; equality means membership.
    UuidList,
    /// Case-insensitive substring match over several text columns. Filter only.
    Search(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Name used in query strings and JSON.
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub sortable: bool,
    pub selectable: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column,
            kind,
            sortable: true,
            selectable: true,
        }
    }

    pub const fn unsortable(self) -> Self {
        Self {
            sortable: false,
            ..self
        }
    }

    pub const fn filter_only(self) -> Self {
        Self {
            sortable: false,
            selectable: false,
            ..self
        }
    }
}

/// A table that can be listed through [`ListQuery`].
pub trait Listable {
    const TABLE: &'static str;
    /// Column list of the row type loaded by list queries.
    const COLUMNS: &'static str;
    const FIELDS: &'static [FieldSpec];
    const DEFAULT_SORT: &'static str = "-createdAt";

    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub struct Widgets;

    impl Listable for Widgets {
        const TABLE: &'static str = "widgets";
        const COLUMNS: &'static str = "id, name, created_at";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::new("_id", "id", FieldKind::Uuid),
            FieldSpec::new("name", "name", FieldKind::Text),
            FieldSpec::new("code", "code", FieldKind::LowercaseText),
            FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
            FieldSpec::new(
                "color",
                "color",
                FieldKind::Enum {
                    type_name: "widget_color",
                    variants: &["red", "blue"],
                },
            ),
            FieldSpec::new("owner", "owner_id", FieldKind::Uuid),
            FieldSpec::new("watchers", "watchers", FieldKind::UuidList).unsortable(),
            FieldSpec::new("search", "", FieldKind::Search(&["name", "notes"])).filter_only(),
        ];
    }
}
