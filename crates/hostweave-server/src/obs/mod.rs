//! Observability: subscriber setup for console and daily log files.

pub mod logging;
