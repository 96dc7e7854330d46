//! Middleware components for HTTP response processing.
//!
//! Currently only security and caching headers; layered onto the router in
//! [`crate::routes::build_router`].

pub mod security_headers;
