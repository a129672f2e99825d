//! API Module
//!
//! Sample HTTP host exposing the cache over a small REST API.
//!
//! # Endpoints
//! - `GET /cache/:key` - Retrieve a value by key
//! - `PUT /cache/:key` - Store a value
//! - `POST /cache/:key/refresh` - Expire-check a key
//! - `DELETE /cache/:key` - Delete a key
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
