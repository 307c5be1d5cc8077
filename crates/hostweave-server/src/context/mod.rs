//! Per-request context types shared across layers.
//!
//! `TenantResolver` picks the configuration scope for a host;
//! `RequestContext` carries everything a module sees for one request.

pub mod request;
pub mod tenant;

pub use request::{Closed, Reply, Request, RequestContext, RequestLog, ResponseSlot};
pub use tenant::TenantResolver;
