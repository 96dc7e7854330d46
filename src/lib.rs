//! # MedienWald Backend Library
//!
//! Core library for MedienWald, a local media-library server. It indexes the media files
//! below one configured library root and streams them over HTTP with byte-range support.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: HTTP server and routing
//! - **Tokio**: async runtime, blocking pool for filesystem work
//! - **walkdir/globset**: directory traversal and exclude patterns
//! - **Serde**: JSON APIs and configuration
//!
//! ## Core Components
//!
//! - [`resolver`]: validates client paths against the library root
//! - [`scanner`]: builds and caches the library index with bounded parallel scans
//! - [`streaming`]: Range negotiation and bounded-memory chunked streaming
//! - [`config`]: layered configuration (embedded defaults, file, environment)
//! - [`error`]: failure taxonomy and HTTP error responses
//! - [`metrics`]: counters for scans and streams
//! - [`middleware`]: security headers
//! - [`routes`]: HTTP handlers and router assembly
//! - [`state`]: shared application state
//! - [`types`]: index data model and DTOs

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod resolver;
pub mod routes;
pub mod scanner;
pub mod state;
pub mod streaming;
pub mod types;

#[cfg(test)]
mod tests;
