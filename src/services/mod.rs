//! Domain services.
//!
//! Logic that spans several repositories or needs the cache lives here so
//! handlers stay thin.

pub mod analytics;
pub mod availability;
pub mod badges;
pub mod grades;
pub mod notifier;
pub mod scoring;
pub mod settings;
