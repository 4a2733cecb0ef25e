//! API Module
//!
//! HTTP handlers and routing that expose the cache to dashboard consumers.
//!
//! # Endpoints
//! - `PUT /cache` - Store a payload under a request fingerprint
//! - `GET /cache?key=...` - Retrieve a fresh payload
//! - `DELETE /cache?key=...` - Delete a key
//! - `GET /keys` - List stored keys
//! - `DELETE /keys` - Clear the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
