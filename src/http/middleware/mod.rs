//! Request middleware.

pub mod interceptor;

pub use interceptor::{blocked_response, interceptor_middleware, BLOCKED_BODY};
