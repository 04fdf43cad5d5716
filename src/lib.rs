//! Cached Atom, RSS and JSON feeds with conditional delivery.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
