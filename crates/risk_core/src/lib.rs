//! # risk_core: Foundation Layer for the Quantrisk Engine
//!
//! Bottom layer of the workspace, providing:
//! - Error types shared across the engine (`types::error`)
//! - Validated confidence levels (`types::confidence`)
//! - Descriptive statistics: moments, percentiles (`stats`)
//! - Root-finding solvers: Brent's method (`math::solvers`)
//!
//! ## Zero Dependency Principle
//!
//! The foundation layer has no dependencies on other `risk_*` crates, with
//! minimal external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - thiserror: Structured error types
//! - serde: Serialisation of value types
//!
//! ## Statelessness
//!
//! Everything in this crate is a pure function or an immutable value type.
//! There are no registries, caches, or global state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod math;
pub mod stats;
pub mod types;
