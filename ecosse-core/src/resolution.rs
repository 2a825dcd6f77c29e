//! Outcome of resolving one dataset for one coordinate.
//!
//! Resolvers never treat a coordinate that simply has no usable data as an error.
//! They return [`Resolution::Skipped`] with the reason so the caller can decide
//! whether the coordinate, or the whole batch, stops there.

use std::fmt;

/// Why a resolver produced no value for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The query was valid but matched no records.
    NoData { what: String },
    /// Entries were found but none of them has attribute records, as for water or
    /// rock map units.
    NoRecords { what: String },
    /// The coordinate lies outside the spatial coverage of a gridded dataset.
    OutOfBounds { dataset: String },
    /// The coordinate's area of interest is not inside a weather resource's declared extent.
    OutOfExtent { resource: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData { what } => write!(f, "no {what} found"),
            SkipReason::NoRecords { what } => write!(f, "{what} found but none has records"),
            SkipReason::OutOfBounds { dataset } => write!(f, "outside limits of {dataset} dataset"),
            SkipReason::OutOfExtent { resource } => write!(f, "lies outwith {resource} limits"),
        }
    }
}

/// Either a resolved value or the reason it could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved(T),
    Skipped(SkipReason),
}

impl<T> Resolution<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Consume the resolution, discarding any skip reason.
    pub fn resolved(self) -> Option<T> {
        match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Skipped(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Resolution<U> {
        match self {
            Resolution::Resolved(value) => Resolution::Resolved(f(value)),
            Resolution::Skipped(reason) => Resolution::Skipped(reason),
        }
    }
}
