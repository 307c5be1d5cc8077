//! Shared fault type across hostweave crates.

use std::io;

use thiserror::Error;

/// Stable classification of a fault, used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Peer went away or the socket broke mid-request.
    Transport,
    /// Resolution or handler execution failed.
    Handler,
    /// Building or rendering the diagnostic page failed.
    Render,
    /// Listener could not be bound.
    Bind,
    /// Configuration could not be loaded.
    Config,
    /// Server lifecycle misuse.
    State,
}

impl FaultKind {
    /// String representation used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::Transport => "TRANSPORT",
            FaultKind::Handler => "HANDLER",
            FaultKind::Render => "RENDER",
            FaultKind::Bind => "BIND",
            FaultKind::Config => "CONFIG",
            FaultKind::State => "STATE",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, Fault>;

/// Unified fault value produced by dispatch, rendering and startup.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("transport: {0}")]
    Transport(String),
    #[error("{0}")]
    Handler(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("bind failed: {0}")]
    Bind(String),
    #[error("config: {0}")]
    Config(String),
    #[error("invalid server state: {0}")]
    State(String),
}

impl Fault {
    pub fn handler(msg: impl Into<String>) -> Self {
        Fault::Handler(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Fault::Render(msg.into())
    }

    /// Classify an I/O error: a vanished peer is a transport fault, anything
    /// else is the handler's problem.
    pub fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => Fault::Transport(e.to_string()),
            _ => Fault::Handler(e.to_string()),
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Transport(_) => FaultKind::Transport,
            Fault::Handler(_) => FaultKind::Handler,
            Fault::Render(_) => FaultKind::Render,
            Fault::Bind(_) => FaultKind::Bind,
            Fault::Config(_) => FaultKind::Config,
            Fault::State(_) => FaultKind::State,
        }
    }

    /// The bare message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Fault::Transport(m)
            | Fault::Handler(m)
            | Fault::Render(m)
            | Fault::Bind(m)
            | Fault::Config(m)
            | Fault::State(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_errors_are_transport() {
        let f = Fault::from_io(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(f.kind(), FaultKind::Transport);
        let f = Fault::from_io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(f.kind(), FaultKind::Transport);
    }

    #[test]
    fn other_io_errors_are_handler_faults() {
        let f = Fault::from_io(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert_eq!(f.kind(), FaultKind::Handler);
        assert_eq!(f.message(), "nope");
    }

    #[test]
    fn kinds_have_stable_codes() {
        assert_eq!(Fault::Bind("x".into()).kind().as_str(), "BIND");
        assert_eq!(Fault::render("x").kind().as_str(), "RENDER");
        assert_eq!(Fault::render("x").to_string(), "render failed: x");
    }
}
