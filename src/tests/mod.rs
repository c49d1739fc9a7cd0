//! Unit tests for the session state machine
//!
//! Collaborators are replaced with a scripted redirect broker and the
//! in-crate mock HTTP client.

pub mod test_helpers;
