//! In-memory authoritative store and index helpers.

/// Helper index aliases.
pub mod indices;
/// SQL `LIKE` pattern matcher.
pub mod like;
/// Authoritative entry store and query execution.
pub mod store;
