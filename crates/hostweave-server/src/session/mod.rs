//! Session state: the per-client record, the shared store and its sweeper.

mod store;
mod sweeper;

pub use store::{Principal, Session, SessionStore};
pub use sweeper::spawn_sweeper;
