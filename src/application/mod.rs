//! Application services: feed assembly and conditional delivery.

pub mod delivery;
pub mod error;
pub mod repos;
pub mod syndication;
