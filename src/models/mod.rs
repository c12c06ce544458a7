//! Request and Response models for the admin API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{BlockRequest, CheckRequest, EventsParams, StatusParams};
pub use responses::{BlockResponse, ClearResponse, ErrorResponse, HealthResponse};
