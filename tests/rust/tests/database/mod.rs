//! Database integration tests
//!
//! SQLite-backed ledger and preference store, alone and under the engine.

mod migrations;
