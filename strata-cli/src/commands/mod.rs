//! CLI command implementations.

pub mod classify;
pub mod common;
pub mod dirs;
pub mod lock;
pub mod resolve;
pub mod resource;
pub mod tree;
