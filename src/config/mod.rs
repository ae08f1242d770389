//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShieldConfig (validated, immutable)
//!     → consumed once at startup by server, registry, observability
//! ```
//!
//! # Design Decisions
//! - Service config is immutable once loaded; rules are the mutable part
//!   and live in the rule registry, not here
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AdminConfig, CorsConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, RulesConfig,
    ShieldConfig, TimeoutConfig, UpstreamConfig,
};
