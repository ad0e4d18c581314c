//! Small shared helpers.

pub mod paths;
