//! Internal helpers for query escaping, text trimming and serde shapes.

pub(crate) mod query;
pub(crate) mod serde;
pub(crate) mod text;
