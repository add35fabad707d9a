//! Shared fixtures for unit tests.

pub(crate) mod polygon;
pub(crate) mod table;
