//! Mapping from raw label records to response shapes.

pub mod label;
