//! SQLite backend for the Lapse copyright store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements
//! [`lapse_core::store::CopyrightStore`] plus the CRUD surface the
//! scheduler's collaborators use (catalog upserts, work/author persistence,
//! default-catalog seeding).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
