//! Core types, rules, and trait definitions for the Lapse copyright tracker.
//!
//! This crate is deliberately free of database dependencies. The rules engine
//! (`rules`, `scheduler`) operates on in-memory records and reaches storage
//! only through the [`store::CopyrightStore`] abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod jurisdiction;
pub mod rules;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod work;

pub use clock::Clock;
pub use scheduler::Scheduler;
pub use status::CopyrightStatus;
