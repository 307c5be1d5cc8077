//! hostweave server library entry.
//!
//! This crate wires config, tenant resolution, the module registry, the
//! dispatcher with its error recovery tiers, the session store and the HTTP
//! transport into a runnable server. It is consumed by the binary
//! (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod obs;
pub mod router;
pub mod server;
pub mod services;
pub mod session;
pub mod templates;
pub mod transport;
