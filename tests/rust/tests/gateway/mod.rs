//! Gateway integration tests
//!
//! Session command protocol, HTTP routes and the lifecycle consumer.

mod session;
