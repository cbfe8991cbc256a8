//! Cache key derivation for article listings.
//!
//! Keys are `<namespace>` followed by `name=value` tokens joined with `&`, in
//! this fixed order:
//!
//! 1. `status=<status>`, or `status!=deleted` when no status was requested
//! 2. `search=<text>` (form-urlencoded)
//! 3. `topic=<id>`
//! 4. `sortBy=<field>`
//! 5. `order=<asc|desc>`
//! 6. `page=<n>` and `limit=<n>`, always present after defaults are applied
//!
//! Filters that were not supplied contribute nothing. A sort field or order
//! equal to the default (`id`, `desc`) is treated as not supplied, so the same
//! logical query never yields two keys. Values are form-urlencoded, so no
//! filter value can forge a separator and make two distinct queries collide.

use url::form_urlencoded::byte_serialize;

use crate::application::listing::{ListingLimits, ListingQuery, SortField, SortOrder};
use crate::domain::types::ArticleStatus;

/// Namespace shared by every listing key; mutations sweep it.
pub const LISTING_NAMESPACE: &str = "newslist:";

#[derive(Debug, Clone)]
pub struct KeyBuilder {
    namespace: String,
    limits: ListingLimits,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>, limits: ListingLimits) -> Self {
        Self {
            namespace: namespace.into(),
            limits,
        }
    }

    /// Prefix that every key built here starts with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn limits(&self) -> ListingLimits {
        self.limits
    }

    pub fn build_key(&self, query: &ListingQuery) -> String {
        let mut tokens: Vec<String> = Vec::with_capacity(7);

        match query.status {
            Some(status) => tokens.push(format!("status={}", status.as_str())),
            None => tokens.push(format!("status!={}", ArticleStatus::Deleted.as_str())),
        }

        if let Some(search) = query.search.as_deref().filter(|value| !value.is_empty()) {
            tokens.push(format!("search={}", encode(search)));
        }

        if let Some(topic) = query.topic {
            tokens.push(format!("topic={topic}"));
        }

        if let Some(field) = query.sort_by.filter(|field| *field != SortField::Id) {
            tokens.push(format!("sortBy={}", field.as_str()));
        }

        if let Some(order) = query.order.filter(|order| *order != SortOrder::Desc) {
            tokens.push(format!("order={}", order.as_str()));
        }

        let window = query.pagination(self.limits);
        tokens.push(format!("page={}", window.page));
        tokens.push(format!("limit={}", window.limit));

        format!("{}{}", self.namespace, tokens.join("&"))
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new(LISTING_NAMESPACE, ListingLimits::default())
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
