//! Presence and fan-out integration tests
//!
//! Runs the real registry, transport and dispatcher behind the session hub.

mod registry;
