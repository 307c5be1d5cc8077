//! Transport layer (HTTP).
//!
//! Adapts axum requests into the dispatcher's transport-independent
//! `Request` and closes its output back into an axum `Response`.

pub mod http;
