//! Rule subsystem.
//!
//! # Data Flow
//! ```text
//! Startup / reload:
//!     store.rs (file → PersistedConfig)
//!     → registry.rs (repair ids, fill index)
//!     → state.rs (sort, atomic swap of the ordered list)
//!
//! Per request:
//!     registry.snapshot() → engine.rs (first match) → interceptor enforces
//!
//! Admin mutation:
//!     registry.rs (write lock) → state.rs (new list, swap) → store.rs (persist)
//! ```
//!
//! # Design Decisions
//! - The ordered list is never mutated in place; readers hold immutable snapshots
//! - Equal priorities keep insertion order
//! - Literal substring matching only

pub mod engine;
pub mod model;
pub mod registry;
pub mod state;
pub mod store;

pub use model::{PersistedConfig, Rule, RuleAction, RulePatch, RuleScope};
pub use registry::{Registry, RegistryError, RuleSnapshot};
pub use store::{ConfigSource, FileRuleStore, RuleStore, StoreError};
