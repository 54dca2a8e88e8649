//! Notification engine integration tests
//!
//! The engine runs over in-memory mocks with a recording delivery seam.

mod read_state;
mod retention;
