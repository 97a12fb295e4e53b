//! Listing filters and pagination metadata.

use std::collections::HashMap;

use serde::Serialize;

use crate::validator::{permitted, Validator};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 6;
pub const DEFAULT_SORT: &str = "-id";

/// Sort values accepted by the post listing.
pub const SORT_SAFELIST: &[&str] = &[
    "id",
    "title",
    "readtime",
    "likescount",
    "-id",
    "-title",
    "-readtime",
    "-likescount",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Title,
    ReadTime,
    LikesCount,
}

/// A safelisted sort column with its direction.
///
/// Only constructed from `SORT_SAFELIST`, so the SQL it renders never
/// contains caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, name) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let column = match name {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "readtime" => SortColumn::ReadTime,
            "likescount" => SortColumn::LikesCount,
            _ => return None,
        };
        Some(Self { column, descending })
    }

    pub fn column_sql(&self) -> &'static str {
        match self.column {
            SortColumn::Id => "p.id",
            SortColumn::Title => "p.title",
            SortColumn::ReadTime => "p.read_time",
            SortColumn::LikesCount => "likes_count",
        }
    }

    pub fn direction_sql(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }

    /// `ORDER BY` body, with the id as a stable tiebreaker.
    pub fn order_by(&self) -> String {
        let dir = self.direction_sql();
        match self.column {
            SortColumn::Id => format!("p.id {dir}"),
            _ => format!("{} {dir}, p.id {dir}", self.column_sql()),
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    /// Substring match on the title; empty matches everything.
    pub title: String,
    /// Author filter; zero means any author.
    pub author_id: i64,
    pub page: i64,
    pub limit: i64,
    pub sort: SortKey,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            title: String::new(),
            author_id: 0,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: SortKey::default(),
        }
    }
}

impl Filters {
    /// Read filters from query parameters, recording problems in `v`.
    pub fn from_query(query: &HashMap<String, String>, v: &mut Validator) -> Self {
        let sort_raw = read_string(query, "sort", DEFAULT_SORT);
        let filters = Self {
            title: read_string(query, "title", ""),
            author_id: read_int(query, "id", 0, v),
            page: read_int(query, "page", DEFAULT_PAGE, v),
            limit: read_int(query, "limit", DEFAULT_LIMIT, v),
            sort: SortKey::parse(&sort_raw).unwrap_or_default(),
        };

        v.check(filters.page > 0, "page", "must be greater than zero");
        v.check(filters.author_id >= 0, "id", "must be greater than zero");
        v.check(filters.page <= 1_000_000, "page", "must be a maximum of 1 million");
        v.check(filters.limit > 0, "limit", "must be greater than zero");
        v.check(filters.limit <= 100, "limit", "must be a maximum of 100");
        v.check(
            permitted(&sort_raw, SORT_SAFELIST),
            "sort",
            "invalid sort value",
        );

        filters
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

fn read_string(query: &HashMap<String, String>, key: &str, default: &str) -> String {
    match query.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

fn read_int(query: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match query.get(key) {
        Some(value) if !value.is_empty() => value.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
        _ => default,
    }
}

/// Pagination metadata. Every field is omitted when there are no records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

impl Metadata {
    pub fn calculate(total_records: i64, page: i64, limit: i64) -> Self {
        if total_records == 0 || limit <= 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size: limit,
            first_page: 1,
            last_page: (total_records + limit - 1) / limit,
            total_records,
        }
    }
}
