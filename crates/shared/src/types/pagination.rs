//! Pagination types for list queries.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Request parameters for paginated queries.
///
/// `page` is 1-indexed. Missing, non-numeric or out of range values fall back
/// to page 1 and limit 10 rather than being rejected, both when deserialized
/// and through [`PageRequest::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page", deserialize_with = "lenient_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_limit", deserialize_with = "lenient_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

/// Accepts a number or numeric string; anything else, or a value below 1,
/// becomes `fallback`.
struct LenientCount {
    fallback: u64,
}

impl LenientCount {
    fn accept(&self, value: Option<u64>) -> u64 {
        value.filter(|n| *n >= 1).unwrap_or(self.fallback)
    }
}

impl Visitor<'_> for LenientCount {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a page number or size")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(self.accept(Some(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        Ok(self.accept(u64::try_from(v).ok()))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<u64, E> {
        Ok(self.fallback)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        Ok(self.accept(v.trim().parse().ok()))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<u64, E> {
        Ok(self.fallback)
    }

    fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
        Ok(self.fallback)
    }
}

fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(LenientCount {
        fallback: default_page(),
    })
}

fn lenient_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(LenientCount {
        fallback: default_limit(),
    })
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Replaces a zero page or limit with its default.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            page: if self.page < 1 { default_page() } else { self.page },
            limit: if self.limit < 1 { default_limit() } else { self.limit },
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn skip(&self) -> u64 {
        let normalized = self.normalized();
        (normalized.page - 1).saturating_mul(normalized.limit)
    }

    /// Maximum number of rows to return.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.normalized().limit
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages, `ceil(total / limit)`.
    pub pages: u64,
    /// The items in the current page.
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Creates a page from the items of `request` and the overall `total`.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: &PageRequest) -> Self {
        Self {
            total,
            pages: total.div_ceil(request.limit()),
            items,
        }
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
