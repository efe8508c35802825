#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod ai;
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod resolve;
pub mod sanitize;
pub mod server;
pub mod state;

mod cache;
mod render;
mod sources;
mod transform;
mod utils;
