//! hostweave core: transport-agnostic primitives shared by the server and
//! its collaborators.
//!
//! This crate defines the fault taxonomy, URL path routing, session token
//! generation and cookie helpers. It carries no runtime or transport
//! dependencies so collaborators (template engines, auth modules) can depend
//! on it without pulling in the server.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `Fault`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cookie;
pub mod error;
pub mod route;
pub mod token;

/// Shared result type.
pub use error::{Fault, FaultKind, Result};
