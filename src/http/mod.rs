//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → middleware/interceptor.rs (rule screening, 403 on block)
//!     → admin routes, or
//!     → upstream.rs (forward to protected application)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;
pub mod upstream;

pub use server::{AppState, HttpServer, ServerError};
pub use upstream::Upstream;
