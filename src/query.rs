//! Query shapes: a row filter plus a sort order.

use crate::types::TimestampMs;

/// Row predicate of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryFilter {
    /// Every row.
    All,
    /// Rows with `start <= timestamp < end`.
    DateRange {
        /// Inclusive lower bound.
        start: TimestampMs,
        /// Exclusive upper bound.
        end: TimestampMs,
    },
    /// Rows whose name equals this exactly.
    Name(String),
}

impl EntryFilter {
    /// Half-open range filter.
    pub fn date_range(start: TimestampMs, end: TimestampMs) -> Self {
        Self::DateRange { start, end }
    }
}

/// Result ordering of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Natural row order.
    #[default]
    Natural,
    /// Name ascending, case-sensitive.
    NameAsc,
    /// Exact reverse of [`SortOrder::NameAsc`].
    NameDesc,
    /// Kind ascending in declared enum order.
    KindAsc,
}

/// Filter and sort pair; also the key of the subscription registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryQuery {
    /// Row predicate.
    pub filter: EntryFilter,
    /// Result ordering.
    pub sort: SortOrder,
}

impl EntryQuery {
    /// Builds a query from parts.
    pub fn new(filter: EntryFilter, sort: SortOrder) -> Self {
        Self { filter, sort }
    }

    /// Every row, natural order.
    pub fn all() -> Self {
        Self::new(EntryFilter::All, SortOrder::Natural)
    }

    /// Half-open date range, natural order.
    pub fn date_range(start: TimestampMs, end: TimestampMs) -> Self {
        Self::new(EntryFilter::date_range(start, end), SortOrder::Natural)
    }

    /// Exact name match, natural order.
    pub fn name(name: impl Into<String>) -> Self {
        Self::new(EntryFilter::Name(name.into()), SortOrder::Natural)
    }

    /// Same filter with a different ordering.
    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}
