//! Shared utilities for the Irori chat relay.
//!
//! Cross-cutting concerns used by every binary in the workspace: logger
//! setup and time utilities with a clock abstraction for testability.

pub mod logger;
pub mod time;
