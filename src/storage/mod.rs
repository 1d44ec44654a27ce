//! Storage adapters.
//!
//! PostgreSQL backs every repository port in production; the in-memory
//! store backs the unit tests.

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use postgres::{PgStore, connect, migrate};
