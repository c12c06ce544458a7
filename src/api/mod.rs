//! API Module
//!
//! Admin HTTP surface over the temporal state subsystem: cache statistics
//! and clearing, security event queries, rate-limit checks and block
//! management. See [`create_router`] for the endpoint list.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
