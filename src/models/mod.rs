//! Model module.
//!
//! Contains domain entities and repository pattern for data access.

pub mod activity_log;
pub mod badge;
pub mod category;
pub mod client;
pub mod conversation;
pub mod grade;
pub mod notification;
pub mod offer;
pub mod password_reset;
pub mod provider;
pub mod report;
pub mod review;
pub mod role;
pub mod service_request;
pub mod setting;
pub mod user;

pub use activity_log::*;
pub use badge::*;
pub use category::*;
pub use client::*;
pub use conversation::*;
pub use grade::*;
pub use notification::*;
pub use offer::*;
pub use password_reset::*;
pub use provider::*;
pub use report::*;
pub use review::*;
pub use role::*;
pub use service_request::*;
pub use setting::*;
pub use user::*;
