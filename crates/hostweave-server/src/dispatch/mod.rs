//! Dispatcher module exports.
//!
//! Re-exports the module registry, the dispatcher and the recovery pipeline
//! so downstream consumers can depend on this module directly.

pub mod dispatcher;
pub mod pipeline;
pub mod registry;

pub use dispatcher::{Dispatcher, Processed, Resolved};
pub use pipeline::Outcome;
pub use registry::{AppModule, ModuleCatalog, ModuleFactory, ModuleRegistry};
