//! Axum router wiring.
//!
//! Every path goes to the dispatcher; module resolution happens there, not in
//! axum's route table.

use axum::Router;

use crate::dispatch::Dispatcher;
use crate::transport;

pub fn build_router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .fallback(transport::http::handle)
        .with_state(dispatcher)
}
