//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, site handler)
//!     → request.rs (request ID for log correlation)
//!     → routing (resolve path against the file cache)
//!     → response.rs (raw file, normalized HTML, redirect, or error status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::Outcome;
pub use server::{AppState, HttpServer};
