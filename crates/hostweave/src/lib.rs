//! Top-level facade crate for hostweave.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use hostweave_core::*;
}

pub mod server {
    pub use hostweave_server::*;
}
