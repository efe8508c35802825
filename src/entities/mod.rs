//! Request workflows behind the HTTP routes. Each one recovers from every
//! upstream failure and always produces a schema-valid response.

pub mod chat;
pub mod drug;
pub mod interaction;
pub mod localized;
pub mod search;
pub mod similar;
