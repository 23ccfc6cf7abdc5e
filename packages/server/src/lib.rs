//! Reference page store: an in-memory implementation of the fetch and
//! batch-apply contract, its HTTP router, and a client for that router.

pub mod client;
pub mod server;
pub mod state;

pub use client::HttpPageStore;
pub use server::{router, ApiError, SharedStore};
pub use state::MemoryPageStore;
