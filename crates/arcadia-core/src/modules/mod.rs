//! Persistence, configuration, logging and input validation.

pub mod config;
pub mod data_manager;
pub mod logger;
pub mod storage;
pub mod validators;
