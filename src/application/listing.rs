//! Listing query model shared by the cache key builder and the article store.

use std::collections::HashMap;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::types::{ArticleStatus, UnknownStatus};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingQueryError {
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
    #[error("unknown sort field `{0}`")]
    UnknownSortField(String),
    #[error("unknown sort order `{0}`")]
    UnknownSortOrder(String),
    #[error("`{name}` must be a positive integer, got `{value}`")]
    NotANumber { name: &'static str, value: String },
    #[error("filter `{0}` supplied more than once")]
    Duplicate(&'static str),
}

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Title,
    Status,
    PublishDate,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::PublishDate => "publish_date",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    /// Fully-qualified column for the listing statement.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "a.id",
            SortField::Title => "a.title",
            SortField::Status => "a.status",
            SortField::PublishDate => "a.publish_date",
            SortField::CreatedAt => "a.created_at",
            SortField::UpdatedAt => "a.updated_at",
        }
    }
}

impl TryFrom<&str> for SortField {
    type Error = ListingQueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            "publish_date" | "publishDate" => Ok(SortField::PublishDate),
            "created_at" | "createdAt" => Ok(SortField::CreatedAt),
            "updated_at" | "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(ListingQueryError::UnknownSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl TryFrom<&str> for SortOrder {
    type Error = ListingQueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ListingQueryError::UnknownSortOrder(value.to_string())),
        }
    }
}

/// Filters accepted by an article listing.
///
/// `status: None` means "everything except soft-deleted articles".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListingQuery {
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
    pub topic: Option<i64>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
    pub page: Option<NonZeroU32>,
    pub limit: Option<NonZeroU32>,
}

impl ListingQuery {
    /// Build a query from loosely-typed name/value pairs such as an HTTP query
    /// string. Unknown names are ignored and empty values count as absent.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, ListingQueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut seen: HashMap<&'static str, String> = HashMap::new();
        for (name, value) in params {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }
            let canonical = match name.as_ref() {
                "status" => "status",
                "search" => "search",
                "topic" => "topic",
                "sortBy" | "sortby" | "sort_by" => "sort_by",
                "order" => "order",
                "page" => "page",
                "limit" => "limit",
                _ => continue,
            };
            if seen.insert(canonical, value.to_string()).is_some() {
                return Err(ListingQueryError::Duplicate(canonical));
            }
        }

        let status = seen
            .get("status")
            .map(|value| ArticleStatus::try_from(value.as_str()))
            .transpose()?;
        let topic = seen
            .get("topic")
            .map(|value| parse_positive("topic", value))
            .transpose()?;
        let sort_by = seen
            .get("sort_by")
            .map(|value| SortField::try_from(value.as_str()))
            .transpose()?;
        let order = seen
            .get("order")
            .map(|value| SortOrder::try_from(value.as_str()))
            .transpose()?;
        let page = seen
            .get("page")
            .map(|value| parse_non_zero("page", value))
            .transpose()?;
        let limit = seen
            .get("limit")
            .map(|value| parse_non_zero("limit", value))
            .transpose()?;

        Ok(Self {
            status,
            search: seen.remove("search"),
            topic,
            sort_by,
            order,
            page,
            limit,
        })
    }

    /// Sort column, defaulting to the article id.
    pub fn sort_field(&self) -> SortField {
        self.sort_by.unwrap_or(SortField::Id)
    }

    /// Sort direction, defaulting to descending.
    pub fn sort_order(&self) -> SortOrder {
        self.order.unwrap_or_default()
    }

    /// Resolve page and limit against the configured bounds.
    pub fn pagination(&self, limits: ListingLimits) -> Pagination {
        let page = self.page.map_or(1, NonZeroU32::get);
        let limit = self
            .limit
            .map_or(limits.default_limit.get(), NonZeroU32::get)
            .min(limits.max_limit.get());
        Pagination { page, limit }
    }
}

/// Bounds applied when resolving a listing's page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingLimits {
    pub default_limit: NonZeroU32,
    pub max_limit: NonZeroU32,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            default_limit: NonZeroU32::new(DEFAULT_LIMIT).unwrap_or(NonZeroU32::MIN),
            max_limit: NonZeroU32::new(MAX_LIMIT).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// Resolved page window; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<i64, ListingQueryError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .ok_or_else(|| ListingQueryError::NotANumber {
            name,
            value: value.to_string(),
        })
}

fn parse_non_zero(name: &'static str, value: &str) -> Result<NonZeroU32, ListingQueryError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ListingQueryError::NotANumber {
            name,
            value: value.to_string(),
        })
}
