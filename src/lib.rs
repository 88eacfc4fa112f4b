//! Services marketplace library.
//!
//! Clients publish service offers, providers apply or get invited, both sides
//! message each other and leave reviews, and administrators moderate the
//! platform.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
